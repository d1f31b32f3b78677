//! The request pipeline: classify, retrieve, respond.


use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::classifier::Classifier;
use crate::config::Config;
use crate::knowledge::{CategoryCatalog, Embedder, KnowledgeBase, Retriever};
use crate::llm::{CompletionService, EmbeddingService, OpenAiClient};
use crate::models::{
    Category, ClassificationOutcome, HelpDeskRequest, HelpDeskResponse, SystemHealth,
};
use crate::responder::Responder;
use crate::{DeskError, Result};

const HEALTHY: &str = "healthy";
const UNHEALTHY: &str = "unhealthy";
const DEGRADED: &str = "degraded";

/// Owns the three pipeline stages and the loaded knowledge base
#[derive(Debug)]
pub struct HelpDesk {
    classifier: Classifier,
    retriever: Retriever,
    responder: Responder,
}

impl HelpDesk {
    #[inline]
    pub fn new(classifier: Classifier, retriever: Retriever, responder: Responder) -> Self {
        Self {
            classifier,
            retriever,
            responder,
        }
    }

    /// Connect to the configured OpenAI compatible API and load (or build) the knowledge base
    #[inline]
    pub async fn from_config(config: &Config) -> Result<Self> {
        let client = Arc::new(OpenAiClient::new(&config.openai)?);
        Self::with_services(config, Arc::<OpenAiClient>::clone(&client), client).await
    }

    /// Assemble the pipeline around explicit model services
    #[inline]
    pub async fn with_services(
        config: &Config,
        completion: Arc<dyn CompletionService>,
        embeddings: Arc<dyn EmbeddingService>,
    ) -> Result<Self> {
        info!("Initializing help desk");

        let catalog = Arc::new(CategoryCatalog::load_or_empty(&config.categories_path()));
        let embedder = Embedder::from_config(embeddings, &config.openai);
        let knowledge = match KnowledgeBase::load_or_build(config, &embedder).await {
            Ok(knowledge) => knowledge,
            Err(DeskError::Embedding(e)) => {
                warn!(
                    "Could not embed the knowledge base ({}), starting without retrieval",
                    e
                );
                KnowledgeBase::empty()
            }
            Err(e) => return Err(e),
        };
        let knowledge = Arc::new(knowledge);

        let classifier = Classifier::new(
            Arc::clone(&completion),
            Arc::clone(&catalog),
            &config.classifier,
        );
        let retriever = Retriever::new(knowledge, embedder, &config.retrieval);
        let responder = Responder::new(completion, catalog, &config.responder);

        info!("Help desk ready");
        Ok(Self::new(classifier, retriever, responder))
    }

    #[inline]
    pub fn knowledge(&self) -> &KnowledgeBase {
        self.retriever.knowledge()
    }

    /// Run one request through the pipeline. Always produces a response.
    #[inline]
    pub async fn process_request(&self, request: HelpDeskRequest) -> HelpDeskResponse {
        let request_id = request
            .request_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        info!(
            "Processing request {}: {}",
            request_id,
            request.user_message.chars().take(50).collect::<String>()
        );

        match self.run_pipeline(&request.user_message, &request_id).await {
            Ok(response) => {
                info!("Request {} processed successfully", request_id);
                response
            }
            Err(e) => {
                error!("Error processing request {}: {}", request_id, e);
                Self::error_response(request_id, &e)
            }
        }
    }

    async fn run_pipeline(&self, message: &str, request_id: &str) -> Result<HelpDeskResponse> {
        let classification = self.classifier.classify(message);
        info!("[{}] Classification: {}", request_id, classification.category);

        let records = self
            .retriever
            .search(message, Some(classification.category), None)
            .await?;
        info!("[{}] Retrieved {} knowledge records", request_id, records.len());

        let response_message = self
            .responder
            .respond(message, &classification, &records, request_id);

        Ok(HelpDeskResponse {
            request_id: request_id.to_string(),
            classification,
            response_message,
        })
    }

    /// Well-formed response for a request the pipeline could not complete
    #[inline]
    pub fn error_response(request_id: String, error: &DeskError) -> HelpDeskResponse {
        HelpDeskResponse {
            request_id,
            classification: ClassificationOutcome {
                category: Category::PolicyQuestion,
                reasoning: "Error occurred during processing".to_string(),
                escalate: true,
                escalate_reason: Some("System error requires manual intervention".to_string()),
            },
            response_message: format!(
                "I apologize, but I encountered an error while processing your request. Please contact IT support directly. Error: {}",
                error
            ),
        }
    }

    #[inline]
    pub fn system_health(&self) -> SystemHealth {
        let knowledge_status = if self.knowledge().is_ready() {
            HEALTHY
        } else {
            UNHEALTHY
        };

        let components: BTreeMap<String, String> = [
            ("classifier", HEALTHY),
            ("knowledge_base", knowledge_status),
            ("response_generator", HEALTHY),
        ]
        .into_iter()
        .map(|(name, status)| (name.to_string(), status.to_string()))
        .collect();

        let status = if components.values().all(|status| status == HEALTHY) {
            HEALTHY
        } else {
            DEGRADED
        };

        SystemHealth {
            status: status.to_string(),
            components,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
