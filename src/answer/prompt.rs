//! Prompt construction for study questions.

/// Sentence the model is told to give when the material has no answer.
pub const NOT_IN_MATERIAL: &str = "This information is not available in the uploaded content.";

/// Build the prompt sent to the model.
///
/// The study material goes first, then the question, then the rules: answer
/// only from the material, keep it simple, and fall back to
/// [`NOT_IN_MATERIAL`] when the material doesn't cover the question.
pub fn study_prompt(context_text: &str, question: &str) -> String {
    format!(
        "\nYou are an intelligent and helpful study assistant.\n\
         \n\
         ============================\n\
         STUDY MATERIAL\n\
         ============================\n\
         {context_text}\n\
         \n\
         ============================\n\
         STUDENT QUESTION\n\
         ============================\n\
         {question}\n\
         \n\
         ============================\n\
         INSTRUCTIONS\n\
         ============================\n\
         - Answer ONLY using the study material\n\
         - Explain in simple, clear language\n\
         - Use bullet points if helpful\n\
         - Give examples when possible\n\
         - If the answer is not in the material, say:\n  \
         \"{NOT_IN_MATERIAL}\"\n\
         - Do NOT add extra unrelated knowledge\n"
    )
}
