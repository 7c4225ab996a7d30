//! Prompt templates for the solver stages
//!
//! Rendering is deterministic: a prompt is a pure function of its inputs.
//! Template text is kept byte-for-byte stable across runs; several solvers
//! store and compare generated artifacts, so even whitespace matters here.

use crate::types::Passage;

/// Assembles stage prompts from a question, passages, and prior-stage text
pub struct PromptAssembler;

impl PromptAssembler {
    /// Render the numbered context block shared by the RAG-family stages
    pub fn context_block(passages: &[Passage]) -> String {
        passages
            .iter()
            .enumerate()
            .map(|(i, passage)| {
                format!(
                    "- {} \n title: {} \n content: {}\n",
                    i + 1,
                    passage.title,
                    passage.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Generation stage: answer with retrieved context
    pub fn rag_answer(question: &str, passages: &[Passage]) -> String {
        format!(
            "Please answer the question using the following as a reference.\n{}\n\nquestion: {}\n",
            Self::context_block(passages),
            question
        )
    }

    /// Verification-question-generation stage: fact-check questions from a
    /// draft answer, no context
    pub fn verification_questions(draft: &str) -> String {
        format!(
            "Please raise some questions regarding the following text, as I need to use these questions to verify specific information within the text.\nText: {}\n",
            draft
        )
    }

    /// Verification-answering stage: answer the generated questions against
    /// the same retrieved context
    pub fn verification_answers(context_block: &str, questions: &str) -> String {
        format!(
            "Please answer the following questions using the following as a reference.\nContext:\n{}\nQuestions:\n{}\n",
            context_block, questions
        )
    }

    /// Final-synthesis stage: combine everything into the final answer
    pub fn final_synthesis(
        context_block: &str,
        draft: &str,
        questions: &str,
        answers: &str,
        question: &str,
    ) -> String {
        format!(
            "Based on the following context, initial answer, verification questions, and their answers, please provide a final answer to the original question.\nContext:\n{}\nInitial Answer:\n{}\nVerification Questions:\n{}\nVerification Answers:\n{}\nOriginal Question:\n{}\n",
            context_block, draft, questions, answers, question
        )
    }

    /// Revision stage of the consistency check: re-ask the question with
    /// per-sentence hallucination scores as context
    pub fn selfcheck_revision(
        question: &str,
        answer: &str,
        scored_sentences: &[(String, f64)],
    ) -> String {
        let scores = scored_sentences
            .iter()
            .map(|(sentence, score)| format!("Sentence: {sentence} | Score: {score:.4}"))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "I have a question, an answer, and a hallucination score for each sentence in that answer. A higher score indicates a greater degree of hallucination, meaning lower accuracy. I need you to verify the answer based on these scores and provide a revised response to the question.\nQuestion: {question}\nAnswer: {answer}\n\nHallucination Scores: \n{scores}\n\nPlease answer this question again.You should directly output the new answer without including any other content.\n{question}\n"
        )
    }

    /// Per-(sentence, sample) support check used by the prompt-based
    /// consistency scorer
    pub fn consistency_check(sentence: &str, sample: &str) -> String {
        format!(
            "Context: {sample}\n\nSentence: {sentence}\n\nIs the sentence supported by the context above? Answer Yes or No.\n\nAnswer: "
        )
    }

    /// Self-RAG instruction wrapper for the initial completion
    pub fn self_rag_instruction(question: &str) -> String {
        format!("### Instruction:\n{question}\n\n### Response:\n")
    }

    /// Self-RAG evidence-conditioned continuation: prior generation plus one
    /// candidate passage wrapped in paragraph markers
    pub fn self_rag_evidence(prefix: &str, passage: &Passage) -> String {
        format!(
            "{prefix}[Retrieval]<paragraph>{}\n{}</paragraph>",
            passage.title, passage.content
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_block_numbers_passages() {
        let passages = vec![
            Passage::new("Alpha", "first body"),
            Passage::new("Beta", "second body"),
        ];
        let block = PromptAssembler::context_block(&passages);
        assert_eq!(
            block,
            "- 1 \n title: Alpha \n content: first body\n\n- 2 \n title: Beta \n content: second body\n"
        );
    }

    #[test]
    fn rag_prompt_is_deterministic() {
        let passages = vec![Passage::new("T", "C")];
        let a = PromptAssembler::rag_answer("why?", &passages);
        let b = PromptAssembler::rag_answer("why?", &passages);
        assert_eq!(a, b);
        assert!(a.starts_with("Please answer the question using the following as a reference.\n"));
        assert!(a.ends_with("question: why?\n"));
    }

    #[test]
    fn revision_prompt_formats_scores_to_four_places() {
        let scored = vec![("Paris is in France.".to_string(), 0.125)];
        let prompt = PromptAssembler::selfcheck_revision("q", "a", &scored);
        assert!(prompt.contains("Sentence: Paris is in France. | Score: 0.1250"));
        // the question is repeated at the end for the re-ask
        assert!(prompt.ends_with("q\n"));
    }
}
