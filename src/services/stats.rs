use crate::db::VoiceRepository;
use crate::error::Result;
use crate::services::ServiceContext;

#[derive(Clone)]
pub struct StatsService {
    voices: VoiceRepository,
}

impl StatsService {
    pub fn new(context: ServiceContext) -> Self {
        Self {
            voices: VoiceRepository::new(context.pool().clone()),
        }
    }

    /// Total seconds of audio across active records; 0 when there are none
    pub async fn total_active_duration(&self) -> Result<u64> {
        Ok(self.voices.sum_active_durations().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, NewVoice};

    #[tokio::test]
    async fn test_total_follows_deletes() {
        let db = Database::connect_in_memory().await.unwrap();
        db.run_migrations().await.unwrap();
        let context = ServiceContext::new(db.pool().clone());
        let stats = StatsService::new(context.clone());
        let repo = VoiceRepository::new(context.pool().clone());

        assert_eq!(stats.total_active_duration().await.unwrap(), 0);

        repo.create(NewVoice {
            duration_seconds: 30,
            ..Default::default()
        })
        .await
        .unwrap();
        let long = repo
            .create(NewVoice {
                duration_seconds: 750,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(stats.total_active_duration().await.unwrap(), 780);

        repo.soft_delete(long.id).await.unwrap();
        assert_eq!(stats.total_active_duration().await.unwrap(), 30);
    }
}
