use super::{load_required, CommandHandler, ExecutionPlan};
use crate::constants::{collections, fields, messages};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Command, CommandKind, Record, RecordKey};
use crate::resilience::RetryingGateway;
use crate::transaction::Mutation;
use crate::validation::{required_str, validate_length};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};
use uuid::Uuid;

/// Key of the absence record for a student on a given day
pub fn absence_key(student_id: &str, date: NaiveDate) -> RecordKey {
    RecordKey::new(
        collections::ABSENCES,
        format!("{student_id}:{}", date.format("%Y-%m-%d")),
    )
}

/// Files a justification for a recorded absence and marks the absence justified.
///
/// Two mutations in one unit of work: the new justification and the updated
/// absence either both land or neither does.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordJustificationHandler;

impl RecordJustificationHandler {
    fn absence_date(command: &Command) -> PipelineResult<NaiveDate> {
        let raw = required_str(command.payload(), fields::ABSENCE_DATE)?;
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            PipelineError::invalid_input("absenceDate must be a date in YYYY-MM-DD format")
        })
    }

    async fn load_unjustified_absence(
        command: &Command,
        gateway: &RetryingGateway,
    ) -> PipelineResult<Record> {
        let student_id = required_str(command.payload(), fields::STUDENT_ID)?;
        let key = absence_key(student_id, Self::absence_date(command)?);
        let absence = load_required(gateway, &key, messages::ABSENCE_NOT_FOUND).await?;

        let justified = absence
            .data
            .get(fields::JUSTIFIED)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if justified {
            return Err(PipelineError::business_rule(messages::ALREADY_JUSTIFIED));
        }
        Ok(absence)
    }
}

#[async_trait]
impl CommandHandler for RecordJustificationHandler {
    fn kind(&self) -> CommandKind {
        CommandKind::RecordJustification
    }

    fn validate(&self, command: &Command) -> PipelineResult<()> {
        required_str(command.payload(), fields::STUDENT_ID)?;
        Self::absence_date(command)?;
        let reason = required_str(command.payload(), fields::REASON)?;
        validate_length(fields::REASON, reason, 3, 500)
    }

    async fn check_invariants(
        &self,
        command: &Command,
        gateway: &RetryingGateway,
    ) -> PipelineResult<()> {
        Self::load_unjustified_absence(command, gateway)
            .await
            .map(|_| ())
    }

    fn confirmation_prompt(&self, _command: &Command) -> Option<String> {
        None
    }

    async fn plan(&self, command: &Command, gateway: &RetryingGateway) -> PipelineResult<ExecutionPlan> {
        let absence = Self::load_unjustified_absence(command, gateway).await?;
        let payload = command.payload();
        let justification_id = Uuid::new_v4().to_string();

        let justification = json!({
            fields::STUDENT_ID: required_str(payload, fields::STUDENT_ID)?,
            fields::ABSENCE_DATE: Self::absence_date(command)?.format("%Y-%m-%d").to_string(),
            fields::REASON: required_str(payload, fields::REASON)?,
            fields::CREATED_BY: command.requester_id(),
            fields::CREATED_AT: command.created_at().to_rfc3339(),
        });

        let mut justified = absence.data.clone();
        if let Value::Object(map) = &mut justified {
            map.insert(fields::JUSTIFIED.to_string(), Value::Bool(true));
            map.insert(
                fields::JUSTIFICATION_ID.to_string(),
                Value::from(justification_id.as_str()),
            );
        }

        Ok(ExecutionPlan::new(
            vec![
                Mutation::create(
                    RecordKey::new(collections::JUSTIFICATIONS, &justification_id),
                    justification,
                ),
                Mutation::update(absence.key, absence.data, justified),
            ],
            "Justification recorded",
        )
        .producing(justification_id))
    }
}
