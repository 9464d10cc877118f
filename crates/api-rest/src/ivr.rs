//! Voice webhooks.
//!
//! Twilio posts an `application/x-www-form-urlencoded` body on every webhook. The only field used
//! is `Digits`; everything else Twilio sends is ignored. Call state arrives in the query string
//! of the callback URL the previous response set, decoded with the same codec that built it.
//! A missing or unreadable body or query is treated as absent input, never as a client error, so
//! the caller always hears something.

use crate::error::ApiResult;
use crate::AppState;
use aarogyam_core::{ForwardedParams, IvrState};
use axum::{
    extract::{Form, RawQuery, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

/// Form fields posted after a `Gather`.
#[derive(Debug, Default, Deserialize)]
pub struct GatherInput {
    #[serde(rename = "Digits")]
    pub digits: Option<String>,
}

#[axum::debug_handler]
pub async fn welcome(State(state): State<AppState>) -> ApiResult<Response> {
    respond(&state, IvrState::Welcome, ForwardedParams::default(), None)
}

#[axum::debug_handler]
pub async fn handle_language_selection(
    State(state): State<AppState>,
    form: Option<Form<GatherInput>>,
) -> ApiResult<Response> {
    respond(
        &state,
        IvrState::LanguageSelection,
        ForwardedParams::default(),
        digits(form),
    )
}

#[axum::debug_handler]
pub async fn handle_abha_id(
    State(state): State<AppState>,
    form: Option<Form<GatherInput>>,
) -> ApiResult<Response> {
    respond(
        &state,
        IvrState::AbhaEntry,
        ForwardedParams::default(),
        digits(form),
    )
}

#[axum::debug_handler]
pub async fn handle_menu_selection(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    form: Option<Form<GatherInput>>,
) -> ApiResult<Response> {
    let params = ForwardedParams::from_query(query.as_deref().unwrap_or(""));
    respond(&state, IvrState::MenuSelection, params, digits(form))
}

fn digits(form: Option<Form<GatherInput>>) -> Option<String> {
    form.and_then(|Form(input)| input.digits)
}

fn respond(
    state: &AppState,
    ivr_state: IvrState,
    params: ForwardedParams,
    digits: Option<String>,
) -> ApiResult<Response> {
    tracing::info!(
        path = ivr_state.path(),
        digits = digits.as_deref().unwrap_or(""),
        "voice webhook"
    );
    let step = state.machine.advance(ivr_state, &params, digits.as_deref())?;
    let body = step.to_twiml()?;
    Ok(([(header::CONTENT_TYPE, twiml::CONTENT_TYPE)], body).into_response())
}
