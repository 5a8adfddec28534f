use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::app_state::AppState;
use crate::models::{ApiResponse, Flight, FlightList, FlightStatusRequest};
use crate::services::FlightBoard;

type StatusReply = Result<Json<ApiResponse<Flight>>, (StatusCode, Json<ApiResponse<Flight>>)>;

/// Flights registered at bootstrap; empty until registration finishes.
pub async fn list_flights(State(board): State<FlightBoard>) -> Json<FlightList> {
    Json(FlightList {
        data: board.list().to_vec(),
    })
}

/// Ask the ledger to raise an oracle request for a published flight
pub async fn request_flight_status(
    State(app_state): State<AppState>,
    Json(request): Json<FlightStatusRequest>,
) -> StatusReply {
    if let Err(e) = request.validate() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::err(format!("Validation error: {}", e))),
        ));
    }

    let Some(flight) = app_state.flights.find(|flight| request.matches(flight)).cloned() else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::err("Flight not found")),
        ));
    };

    let Some(requester) = app_state.requester.get() else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::err("Ledger accounts are not loaded yet")),
        ));
    };

    match app_state
        .ledger
        .fetch_flight_status(requester, &flight.airline, &flight.flight, flight.timestamp)
        .await
    {
        Ok(()) => {
            tracing::info!(flight = %flight.flight, airline = %flight.airline, "flight status requested");
            Ok(Json(ApiResponse::ok(flight)))
        }
        Err(e) => {
            tracing::warn!(flight = %flight.flight, error = %e, "flight status request rejected");
            Err((
                StatusCode::BAD_GATEWAY,
                Json(ApiResponse::err(format!("Ledger rejected request: {}", e))),
            ))
        }
    }
}
