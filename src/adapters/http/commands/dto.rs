//! Request/response shapes for the command and event endpoints.

use serde::{Deserialize, Serialize};

use crate::domain::command::ListFilter;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::telemetry::{Cursor, EventFilter, Severity};

/// Query parameters for `GET /api/commands`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,

    #[serde(rename = "type")]
    pub command_type: Option<String>,

    pub since: Option<Timestamp>,
}

impl ListQuery {
    /// Converts to a domain filter, validating the status value.
    pub fn into_filter(self) -> Result<ListFilter, DomainError> {
        let status = self
            .status
            .map(|s| s.parse())
            .transpose()
            .map_err(DomainError::from)?;

        Ok(ListFilter {
            status,
            command_type: self.command_type,
            since: self.since,
        })
    }
}

/// Query parameters for `GET /api/events`.
///
/// List-valued dimensions arrive comma-separated; the cursor is parsed
/// leniently because an unknown token simply means "from the beginning
/// of the retained window".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventsQuery {
    pub cursor: Option<String>,
    pub severity: Option<String>,
    pub event_types: Option<String>,
    pub session_id: Option<String>,
    pub account_id: Option<String>,
    pub platform: Option<String>,
}

impl EventsQuery {
    /// The replay position, when the token parses as a cursor.
    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor.as_deref().and_then(|s| s.parse().ok())
    }

    /// Converts the filter dimensions, validating severity values.
    pub fn into_filter(self) -> Result<EventFilter, DomainError> {
        let severity = self
            .severity
            .map(|list| {
                list.split(',')
                    .map(|s| s.trim().parse::<Severity>())
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()
            .map_err(DomainError::from)?;

        let event_types = self.event_types.map(|list| {
            list.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        });

        Ok(EventFilter {
            severity,
            event_types,
            session_id: self.session_id,
            account_id: self.account_id,
            platform: self.platform,
        })
    }
}

/// Response body for `POST /api/commands/{id}/cancel`.
#[derive(Debug, Clone, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

/// Error body returned by every endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl From<&DomainError> for ErrorBody {
    fn from(err: &DomainError) -> Self {
        Self {
            code: err.code.to_string(),
            message: err.message.clone(),
        }
    }
}
