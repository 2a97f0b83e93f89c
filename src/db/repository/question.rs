use sqlx::SqlitePool;

use crate::db::StoreResult;
use crate::db::models::Question;

/// Repository for the `questions` table
#[derive(Clone, Debug)]
pub struct QuestionRepository {
    pool: SqlitePool,
}

impl QuestionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All questions, ordered by id
    pub async fn list(&self) -> StoreResult<Vec<Question>> {
        let questions = sqlx::query_as::<_, Question>("SELECT id, text FROM questions ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(questions)
    }

    pub async fn create(&self, text: &str) -> StoreResult<Question> {
        let result = sqlx::query("INSERT INTO questions (text) VALUES (?)")
            .bind(text)
            .execute(&self.pool)
            .await?;
        Ok(Question {
            id: result.last_insert_rowid(),
            text: text.to_string(),
        })
    }

    /// Returns false when the id does not exist
    pub async fn delete(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM questions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn test_repo() -> QuestionRepository {
        let db = Database::connect_in_memory().await.unwrap();
        db.run_migrations().await.unwrap();
        QuestionRepository::new(db.pool().clone())
    }

    #[tokio::test]
    async fn test_list_empty() {
        let repo = test_repo().await;
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_and_list_in_order() {
        let repo = test_repo().await;
        repo.create("Question 1").await.unwrap();
        repo.create("Question 2").await.unwrap();

        let questions = repo.list().await.unwrap();
        assert_eq!(
            questions,
            vec![
                Question {
                    id: 1,
                    text: "Question 1".to_string()
                },
                Question {
                    id: 2,
                    text: "Question 2".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = test_repo().await;
        let q = repo.create("Describe your hometown").await.unwrap();
        assert!(repo.delete(q.id).await.unwrap());
        assert!(!repo.delete(q.id).await.unwrap());
        assert!(repo.list().await.unwrap().is_empty());
    }
}
