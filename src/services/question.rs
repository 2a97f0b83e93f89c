use crate::db::{Question, QuestionRepository};
use crate::error::{LangomineError, Result};
use crate::services::ServiceContext;

#[derive(Clone)]
pub struct QuestionService {
    questions: QuestionRepository,
}

impl QuestionService {
    pub fn new(context: ServiceContext) -> Self {
        Self {
            questions: QuestionRepository::new(context.pool().clone()),
        }
    }

    pub async fn list(&self) -> Result<Vec<Question>> {
        Ok(self.questions.list().await?)
    }

    pub async fn add(&self, text: &str) -> Result<Question> {
        let text = text.trim();
        if text.is_empty() {
            return Err(LangomineError::Validation(
                "question text must not be empty".to_string(),
            ));
        }
        let question = self.questions.create(text).await?;
        tracing::info!("Added question {}", question.id);
        Ok(question)
    }

    pub async fn remove(&self, id: i64) -> Result<()> {
        if self.questions.delete(id).await? {
            Ok(())
        } else {
            Err(LangomineError::NotFound(format!("question {}", id)))
        }
    }
}
