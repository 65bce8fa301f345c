//! Axum request handlers for all service endpoints.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common::model::EncryptedCardRecord;
use common::protocol::{
    BillListResponse, CardListResponse, ErrorResponse, FieldReveal, HealthResponse,
    NewBillRequest, NewTicketRequest, RevealResponse, SaveCardRequest, SavedResponse,
    TicketListResponse,
};
use common::{RecordId, ServiceError, UserId};
use serde::Deserialize;
use tracing::{info, warn};

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::state::AppState;
use crate::cards::{CardField, CardMetadata, CodecError, PlaintextCardFields};
use crate::crypto::{DecryptError, EncryptError};
use crate::records::{self, RecordError};
use crate::store::StoreError;

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Handler error: a [`ServiceError`] rendered as an [`ErrorResponse`] body.
#[derive(Debug)]
pub struct ApiError(ServiceError);

impl<E> From<E> for ApiError
where
    E: Into<ServiceError>,
{
    fn from(e: E) -> Self {
        ApiError(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse::new(self.0.code(), self.0.to_string());
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Rejected(m) => ServiceError::BadRequest(m),
            StoreError::Unavailable(m) => ServiceError::Unavailable(m),
            StoreError::NotFound(id) => ServiceError::NotFound(format!("card {id}")),
        }
    }
}

impl From<CodecError> for ServiceError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::Encrypt {
                source: EncryptError::AeadFailure,
                ..
            } => ServiceError::Internal(e.to_string()),
            _ => ServiceError::BadRequest(e.to_string()),
        }
    }
}

impl From<RecordError> for ServiceError {
    fn from(e: RecordError) -> Self {
        ServiceError::BadRequest(e.to_string())
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Resolve the caller from the configured identity header.
fn current_user(headers: &HeaderMap, state: &AppState) -> Result<UserId, ServiceError> {
    headers
        .get(state.user_header_name.as_str())
        .and_then(|v| v.to_str().ok())
        .and_then(UserId::parse)
        .ok_or_else(|| {
            ServiceError::Unauthorized(format!("missing {} header", state.user_header_name))
        })
}

/// Split a form submission into its secret and non-secret halves.
fn split_card_request(req: SaveCardRequest) -> (PlaintextCardFields, CardMetadata) {
    let fields = PlaintextCardFields {
        card_number: req.card_number,
        expiry: req.expiry,
        cvv: req.cvv,
    };
    let metadata = CardMetadata {
        card_name: req.card_name,
        card_type: req.card_type,
        bank_name: req.bank_name,
    };
    (fields, metadata)
}

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

/// `POST /cards` — seal the submitted card and store it.
pub async fn save_card(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<SaveCardRequest>,
) -> ApiResult<Response> {
    let user = current_user(&headers, &state)?;
    let (fields, metadata) = split_card_request(req);
    let record = state.codec.seal(&fields, &user, metadata)?;
    let id = state.cards.save(record).await?;
    info!(record_id = %id, "card stored");
    Ok((StatusCode::CREATED, Json(SavedResponse { id })).into_response())
}

/// `GET /cards` — the caller's encrypted card rows.
pub async fn list_cards(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<CardListResponse>> {
    let user = current_user(&headers, &state)?;
    let cards = state.cards.list_for_owner(&user).await?;
    Ok(Json(CardListResponse { cards }))
}

/// `PUT /cards/{id}` — re-save a card, replacing every encrypted field.
pub async fn replace_card(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(req): ApiJson<SaveCardRequest>,
) -> ApiResult<Json<SavedResponse>> {
    let user = current_user(&headers, &state)?;
    let existing = state.cards.get_for_owner(&user, id).await?;
    let (fields, metadata) = split_card_request(req);
    let record = state.codec.reseal(&existing, &fields, metadata)?;
    state.cards.replace(&user, record).await?;
    info!(record_id = %id, "card replaced");
    Ok(Json(SavedResponse { id }))
}

/// `DELETE /cards/{id}`.
pub async fn delete_card(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<StatusCode> {
    let user = current_user(&headers, &state)?;
    state.cards.delete(&user, id).await?;
    info!(record_id = %id, "card deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Query string for the reveal endpoint.
#[derive(Debug, Deserialize)]
pub struct RevealQuery {
    /// Reveal only this field; all three when absent.
    pub field: Option<CardField>,
}

/// `GET /cards/{id}/reveal[?field=...]` — decrypt card fields on demand.
///
/// Each field is reported on its own: an unreadable field never blanks the
/// others and is never shown as an empty value.
pub async fn reveal_card(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<RecordId>,
    ApiQuery(query): ApiQuery<RevealQuery>,
) -> ApiResult<Json<RevealResponse>> {
    let user = current_user(&headers, &state)?;
    let record = state.cards.get_for_owner(&user, id).await?;

    let mut resp = RevealResponse::default();
    match query.field {
        Some(field) => {
            let outcome = state.codec.reveal_field(&record, field, &user);
            set_field(&mut resp, field, to_reveal(&record, field, outcome));
        }
        None => {
            let report = state.codec.reveal_each(&record, &user);
            for field in CardField::ALL {
                let outcome = report.get(field).clone();
                set_field(&mut resp, field, to_reveal(&record, field, outcome));
            }
        }
    }
    Ok(Json(resp))
}

fn to_reveal(
    record: &EncryptedCardRecord,
    field: CardField,
    outcome: Result<String, DecryptError>,
) -> FieldReveal {
    match outcome {
        Ok(value) => FieldReveal::Revealed { value },
        Err(e) => {
            warn!(record_id = %record.id, %field, reason = e.reason(), "card field could not be decrypted");
            FieldReveal::unreadable(e.reason())
        }
    }
}

fn set_field(resp: &mut RevealResponse, field: CardField, value: FieldReveal) {
    let slot = match field {
        CardField::CardNumber => &mut resp.card_number,
        CardField::Expiry => &mut resp.expiry,
        CardField::Cvv => &mut resp.cvv,
    };
    *slot = Some(value);
}

// ---------------------------------------------------------------------------
// Tickets and bills
// ---------------------------------------------------------------------------

/// `POST /tickets`.
pub async fn create_ticket(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<NewTicketRequest>,
) -> ApiResult<Response> {
    let user = current_user(&headers, &state)?;
    let ticket = records::new_ticket(&user, req)?;
    let id = ticket.id;
    state.tickets.insert(ticket).await;
    Ok((StatusCode::CREATED, Json(SavedResponse { id })).into_response())
}

/// `GET /tickets`.
pub async fn list_tickets(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<TicketListResponse>> {
    let user = current_user(&headers, &state)?;
    let tickets = state.tickets.list_for_owner(&user).await;
    Ok(Json(TicketListResponse { tickets }))
}

/// `POST /bills`.
pub async fn create_bill(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<NewBillRequest>,
) -> ApiResult<Response> {
    let user = current_user(&headers, &state)?;
    let bill = records::new_bill(&user, req)?;
    let id = bill.id;
    state.bills.insert(bill).await;
    Ok((StatusCode::CREATED, Json(SavedResponse { id })).into_response())
}

/// `GET /bills`.
pub async fn list_bills(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<BillListResponse>> {
    let user = current_user(&headers, &state)?;
    let bills = state.bills.list_for_owner(&user).await;
    Ok(Json(BillListResponse { bills }))
}

/// `GET /dashboard` — tickets, cards and bills loaded concurrently.
pub async fn dashboard(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    let user = current_user(&headers, &state)?;
    let body = records::load_dashboard(&state.tickets, &state.cards, &state.bills, &user).await;
    Ok(Json(body).into_response())
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// `GET /health` — liveness check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        key_derivation: state.codec.keys().derivation().as_str().into(),
    })
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}
