use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use super::decision::{decide, justify};
use super::extract::extract_fields;
use super::QueryError;
use crate::config::QueryConfig;
use crate::models::QueryResult;

/// Mock claim query engine with a bounded, newest-first history.
pub struct QueryEngine {
    config: QueryConfig,
    history: Mutex<Vec<QueryResult>>,
    rng: Mutex<StdRng>,
}

impl QueryEngine {
    pub fn new(config: QueryConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            history: Mutex::new(Vec::new()),
            rng: Mutex::new(rng),
        }
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn history_lock(&self) -> MutexGuard<'_, Vec<QueryResult>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Extraction, decision and justification without delay or history.
    pub fn analyze(&self, query: &str) -> Result<QueryResult, QueryError> {
        self.analyze_timed(query, Duration::ZERO)
    }

    fn analyze_timed(&self, query: &str, elapsed: Duration) -> Result<QueryResult, QueryError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        let text = query.to_lowercase();
        let extracted = extract_fields(&text);
        let verdict = decide(&text, self.config.fallback, &mut *self.rng());
        let justifications = justify(&verdict);

        Ok(QueryResult {
            id: Uuid::new_v4(),
            query: query.to_string(),
            decision: verdict.decision,
            amount: Some(verdict.amount),
            confidence: verdict.confidence,
            processing_time: format!("{:.1}s", elapsed.as_secs_f64()),
            extracted,
            justifications,
            created_at: Utc::now(),
        })
    }

    fn processing_delay(&self) -> Duration {
        let min = self.config.min_delay_ms;
        let max = self.config.max_delay_ms;
        let ms = if max <= min {
            min
        } else {
            self.rng().gen_range(min..max)
        };
        Duration::from_millis(ms)
    }

    /// Wait the simulated processing delay, analyze, and record in history.
    pub async fn submit(&self, query: &str) -> Result<QueryResult, QueryError> {
        if query.trim().is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        let started = Instant::now();
        tokio::time::sleep(self.processing_delay()).await;
        let result = self.analyze_timed(query, started.elapsed())?;

        tracing::info!(
            query_id = %result.id,
            decision = %result.decision,
            confidence = result.confidence,
            fields = result.extracted.len(),
            "Query processed"
        );

        let mut history = self.history_lock();
        history.insert(0, result.clone());
        history.truncate(self.config.history_limit);
        Ok(result)
    }

    /// Past results, newest first.
    pub fn history(&self) -> Vec<QueryResult> {
        self.history_lock().clone()
    }

    pub fn clear_history(&self) {
        self.history_lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FallbackPolicy;
    use crate::models::{Decision, FieldType};
    use crate::query::decision::KNEE_SURGERY;

    fn instant_config() -> QueryConfig {
        QueryConfig {
            min_delay_ms: 0,
            max_delay_ms: 0,
            seed: Some(9),
            history_limit: 2,
            ..QueryConfig::default()
        }
    }

    #[test]
    fn knee_surgery_scenario() {
        let engine = QueryEngine::new(QueryConfig::default());
        let result = engine
            .analyze("46-year-old male, knee surgery in Pune, 3-month-old insurance policy")
            .unwrap();

        assert_eq!(result.field(FieldType::Age), Some("46 years"));
        assert_eq!(result.field(FieldType::Gender), Some("Male"));
        assert_eq!(result.field(FieldType::Procedure), Some("Knee Surgery"));
        assert_eq!(result.field(FieldType::Location), Some("Pune, India"));
        assert_eq!(result.field(FieldType::PolicyDuration), Some("3 months"));
        assert_eq!(result.decision, Decision::Approved);
        assert_eq!((result.confidence, result.amount), (KNEE_SURGERY.0, Some(KNEE_SURGERY.1)));
        assert_eq!(result.justifications.len(), 2);
    }

    #[test]
    fn pre_existing_is_rejected_regardless_of_fields() {
        let engine = QueryEngine::new(QueryConfig::default());
        let result = engine
            .analyze("35 year old female, knee surgery in Mumbai, pre-existing diabetes")
            .unwrap();
        assert_eq!(result.decision, Decision::Rejected);
        assert_eq!(result.amount, Some(0));
        assert_eq!(result.confidence, 95);
        assert_eq!(result.field(FieldType::Procedure), Some("Knee Surgery"));
    }

    #[test]
    fn empty_query_rejected() {
        let engine = QueryEngine::new(QueryConfig::default());
        assert!(matches!(engine.analyze("   "), Err(QueryError::EmptyQuery)));
    }

    #[test]
    fn seeded_fallback_is_reproducible() {
        let a = QueryEngine::new(instant_config()).analyze("routine checkup").unwrap();
        let b = QueryEngine::new(instant_config()).analyze("routine checkup").unwrap();
        assert_eq!((a.confidence, a.amount), (b.confidence, b.amount));
    }

    #[test]
    fn fixed_fallback_policy_applies() {
        let engine = QueryEngine::new(QueryConfig {
            fallback: FallbackPolicy::Fixed { confidence: 70, amount: 5_000 },
            ..instant_config()
        });
        let result = engine.analyze("routine checkup").unwrap();
        assert_eq!((result.confidence, result.amount), (70, Some(5_000)));
    }

    #[tokio::test]
    async fn submit_prepends_bounded_history() {
        let engine = QueryEngine::new(instant_config());
        engine.submit("dental cleaning").await.unwrap();
        engine.submit("emergency visit").await.unwrap();
        let latest = engine.submit("knee surgery").await.unwrap();

        let history = engine.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, latest.id);
        assert_eq!(history[1].query, "emergency visit");
        assert!(latest.processing_time.ends_with('s'));

        engine.clear_history();
        assert!(engine.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn submit_waits_configured_delay() {
        let engine = QueryEngine::new(QueryConfig {
            seed: Some(1),
            ..QueryConfig::default()
        });
        let started = tokio::time::Instant::now();
        engine.submit("dental").await.unwrap();
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(2_000));
        assert!(waited < Duration::from_millis(3_000));
    }

    #[tokio::test]
    async fn submit_rejects_empty_without_history() {
        let engine = QueryEngine::new(instant_config());
        assert!(engine.submit("").await.is_err());
        assert!(engine.history().is_empty());
    }
}
