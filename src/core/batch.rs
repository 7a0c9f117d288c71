use crate::domain::document::Document;
use crate::domain::model::ApiResponse;
use crate::domain::ports::DocumentApi;
use crate::utils::error::{CrptError, Result};
use crate::utils::monitor::SystemMonitor;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Submission {
    pub document: Arc<Document>,
    pub signature: String,
}

impl Submission {
    pub fn new(document: Arc<Document>, signature: impl Into<String>) -> Self {
        Self {
            document,
            signature: signature.into(),
        }
    }
}

#[derive(Debug)]
pub struct SubmissionOutcome {
    pub index: usize,
    pub signature: String,
    pub result: Result<ApiResponse>,
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(&self.result, Ok(response) if response.is_success())
    }
}

#[derive(Debug)]
pub struct BatchReport {
    pub outcomes: Vec<SubmissionOutcome>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Transport errors plus non-2xx responses.
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Sends every submission from its own task through one shared API client.
pub struct BatchSubmitter<A: DocumentApi + 'static> {
    api: Arc<A>,
    monitor: SystemMonitor,
}

impl<A: DocumentApi + 'static> BatchSubmitter<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self::new_with_monitoring(api, false)
    }

    pub fn new_with_monitoring(api: Arc<A>, monitor_enabled: bool) -> Self {
        Self {
            api,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self, submissions: Vec<Submission>) -> BatchReport {
        let started = Instant::now();
        let total = submissions.len();
        tracing::info!("Submitting {} document(s)", total);
        self.monitor.log_stats("Before submission");

        let mut handles = Vec::with_capacity(total);
        for (index, submission) in submissions.into_iter().enumerate() {
            let api = Arc::clone(&self.api);
            let signature = submission.signature.clone();
            let handle = tokio::spawn(async move {
                api.create_documents(&submission.document, &submission.signature)
                    .await
            });
            handles.push((index, signature, handle));
        }

        let mut outcomes = Vec::with_capacity(total);
        for (index, signature, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(CrptError::ProcessingError {
                    message: format!("submission task {} failed: {}", index, e),
                }),
            };

            match &result {
                Ok(response) => tracing::info!(
                    "Submission {} ({}) finished with status {}",
                    index,
                    signature,
                    response.status
                ),
                Err(e) => tracing::error!("Submission {} ({}) failed: {}", index, signature, e),
            }

            outcomes.push(SubmissionOutcome {
                index,
                signature,
                result,
            });
        }

        let report = BatchReport {
            outcomes,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            "Batch finished: {} succeeded, {} failed in {:?}",
            report.succeeded(),
            report.failed(),
            report.elapsed
        );
        self.monitor.log_final_stats();

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingApi {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DocumentApi for RecordingApi {
        async fn create_documents(
            &self,
            document: &Document,
            signature: &str,
        ) -> Result<ApiResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match signature {
                "panic" => panic!("boom"),
                "reject" => Ok(ApiResponse {
                    status: 400,
                    body: "bad signature".to_string(),
                }),
                _ => Ok(ApiResponse {
                    status: 200,
                    body: document.doc_id.clone().unwrap_or_default(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_outcomes_keep_submission_order() {
        let api = Arc::new(RecordingApi {
            calls: AtomicUsize::new(0),
        });
        let mut doc = Document::introduce_goods();
        doc.doc_id = Some("42".to_string());
        let doc = Arc::new(doc);

        let submissions = vec![
            Submission::new(Arc::clone(&doc), "sig-1"),
            Submission::new(Arc::clone(&doc), "reject"),
            Submission::new(Arc::clone(&doc), "sig-3"),
        ];

        let report = BatchSubmitter::new(Arc::clone(&api)).run(submissions).await;

        assert_eq!(api.calls.load(Ordering::SeqCst), 3);
        let indexes: Vec<usize> = report.outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert_eq!(report.outcomes[1].signature, "reject");
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.outcomes[0].result.as_ref().unwrap().body, "42");
    }

    #[tokio::test]
    async fn test_panicking_submission_is_reported() {
        let api = Arc::new(RecordingApi {
            calls: AtomicUsize::new(0),
        });
        let doc = Arc::new(Document::introduce_goods());

        let report = BatchSubmitter::new(api)
            .run(vec![
                Submission::new(Arc::clone(&doc), "panic"),
                Submission::new(doc, "ok"),
            ])
            .await;

        assert!(matches!(
            report.outcomes[0].result,
            Err(CrptError::ProcessingError { .. })
        ));
        assert!(report.outcomes[1].is_success());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let api = Arc::new(RecordingApi {
            calls: AtomicUsize::new(0),
        });
        let report = BatchSubmitter::new(api).run(Vec::new()).await;
        assert!(report.outcomes.is_empty());
        assert_eq!(report.failed(), 0);
    }
}
