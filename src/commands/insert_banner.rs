use super::{load_required, CommandHandler, ExecutionPlan};
use crate::config::BusinessConfig;
use crate::constants::{collections, fields, messages};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Command, CommandKind, RecordKey};
use crate::resilience::RetryingGateway;
use crate::transaction::Mutation;
use crate::validation::{bytes_field, required_str};
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

/// Attaches a banner image to a rest point, up to the point's banner cap
#[derive(Debug, Clone)]
pub struct InsertBannerHandler {
    business: BusinessConfig,
}

impl InsertBannerHandler {
    pub fn new(business: BusinessConfig) -> Self {
        Self { business }
    }

    fn image_type(&self, command: &Command) -> PipelineResult<String> {
        let image_type = required_str(command.payload(), fields::IMAGE_TYPE)?.to_ascii_lowercase();
        if !self
            .business
            .allowed_image_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&image_type))
        {
            return Err(PipelineError::invalid_input(messages::UNSUPPORTED_IMAGE_TYPE));
        }
        Ok(image_type)
    }
}

#[async_trait]
impl CommandHandler for InsertBannerHandler {
    fn kind(&self) -> CommandKind {
        CommandKind::InsertBanner
    }

    fn validate(&self, command: &Command) -> PipelineResult<()> {
        let payload = command.payload();
        required_str(payload, fields::REST_POINT_ID)?;

        let image = bytes_field(payload, fields::IMAGE_DATA)?;
        if image.is_empty() {
            return Err(PipelineError::invalid_input(messages::NO_IMAGE_SELECTED));
        }
        if image.len() > self.business.max_image_bytes {
            return Err(PipelineError::invalid_input(format!(
                "Image exceeds the maximum size of {} bytes",
                self.business.max_image_bytes
            )));
        }

        self.image_type(command).map(|_| ())
    }

    async fn check_invariants(
        &self,
        command: &Command,
        gateway: &RetryingGateway,
    ) -> PipelineResult<()> {
        let rest_point_id = required_str(command.payload(), fields::REST_POINT_ID)?;
        let rest_point = load_required(
            gateway,
            &RecordKey::new(collections::REST_POINTS, rest_point_id),
            messages::REST_POINT_NOT_FOUND,
        )
        .await?;

        let cap = rest_point
            .data
            .get(fields::MAX_BANNERS)
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
            .unwrap_or(self.business.max_banners_per_rest_point);

        let existing = gateway
            .count_where(collections::BANNERS, fields::REST_POINT_ID, &json!(rest_point_id))
            .await?;

        debug!(
            rest_point_id = rest_point_id,
            existing = existing,
            cap = cap,
            "Banner capacity check"
        );

        if existing >= cap {
            return Err(PipelineError::business_rule(messages::MAX_BANNERS_REACHED));
        }
        Ok(())
    }

    fn confirmation_prompt(&self, command: &Command) -> Option<String> {
        let rest_point_id = required_str(command.payload(), fields::REST_POINT_ID).unwrap_or_default();
        Some(format!("Insert the selected banner into rest point {rest_point_id}?"))
    }

    async fn plan(
        &self,
        command: &Command,
        _gateway: &RetryingGateway,
    ) -> PipelineResult<ExecutionPlan> {
        let payload = command.payload();
        let banner_id = Uuid::new_v4().to_string();
        let banner = json!({
            fields::REST_POINT_ID: required_str(payload, fields::REST_POINT_ID)?,
            fields::IMAGE_TYPE: self.image_type(command)?,
            fields::IMAGE_DATA: bytes_field(payload, fields::IMAGE_DATA)?,
            fields::CREATED_BY: command.requester_id(),
            fields::CREATED_AT: command.created_at().to_rfc3339(),
        });

        Ok(ExecutionPlan::new(
            vec![Mutation::create(
                RecordKey::new(collections::BANNERS, &banner_id),
                banner,
            )],
            "Banner inserted",
        )
        .producing(banner_id))
    }
}
