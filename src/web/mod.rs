// 🌐 Web pages - read-only HTML views over the storage
//
// Each request reloads the storage, queries it, renders, then closes it.
// Requests are serialized on one storage handle.

pub mod pages;

use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State as AxumState},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::entities::{related, Amenity, EntityKind, Place, State, User};
use crate::error::{StorageError, StorageResult};
use crate::storage::Storage;
use pages::{PlaceOwner, StateCities};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    storage: Arc<Mutex<Box<dyn Storage>>>,
}

impl AppState {
    pub fn new(storage: Box<dyn Storage>) -> Self {
        AppState {
            storage: Arc::new(Mutex::new(storage)),
        }
    }

    /// Run one request's queries between reload() and close()
    fn with_storage<T, F>(&self, query: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut dyn Storage) -> StorageResult<T>,
    {
        let mut guard = self.storage.lock().map_err(|_| AppError::Poisoned)?;
        let storage = guard.as_mut();

        storage.reload()?;
        let result = query(storage);
        storage.close()?;

        Ok(result?)
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("storage lock poisoned by an earlier request")]
    Poisoned,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}

// ============================================================================
// QUERIES
// ============================================================================

fn sorted_states(storage: &mut dyn Storage) -> StorageResult<Vec<State>> {
    let mut states: Vec<State> = related(storage, |_: &State| true)?;
    states.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(states)
}

fn with_cities(storage: &mut dyn Storage, state: State) -> StorageResult<StateCities> {
    let mut cities = state.cities(storage)?;
    cities.sort_by(|a, b| a.name.cmp(&b.name));
    Ok((state, cities))
}

fn states_with_cities(storage: &mut dyn Storage) -> StorageResult<Vec<StateCities>> {
    sorted_states(storage)?
        .into_iter()
        .map(|state| with_cities(storage, state))
        .collect()
}

fn sorted_amenities(storage: &mut dyn Storage) -> StorageResult<Vec<Amenity>> {
    let mut amenities: Vec<Amenity> = related(storage, |_: &Amenity| true)?;
    amenities.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(amenities)
}

fn places_with_owners(storage: &mut dyn Storage) -> StorageResult<Vec<PlaceOwner>> {
    let mut places: Vec<Place> = related(storage, |_: &Place| true)?;
    places.sort_by(|a, b| a.name.cmp(&b.name));

    let mut listed = Vec::with_capacity(places.len());
    for place in places {
        let owner = storage
            .get(EntityKind::User, &place.user_id)?
            .and_then(|entity| User::try_from(entity).ok());
        listed.push((place, owner));
    }
    Ok(listed)
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /states_list and /states
async fn states_list(AxumState(app): AxumState<AppState>) -> Result<Html<String>, AppError> {
    let states = app.with_storage(sorted_states)?;
    Ok(Html(pages::states_list(&states)))
}

/// GET /cities_by_states
async fn cities_by_states(AxumState(app): AxumState<AppState>) -> Result<Html<String>, AppError> {
    let states = app.with_storage(states_with_cities)?;
    Ok(Html(pages::cities_by_states(&states)))
}

/// GET /states/:id
async fn state_detail(
    AxumState(app): AxumState<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let found = app.with_storage(|storage| {
        match storage.get(EntityKind::State, &id)? {
            Some(entity) => match State::try_from(entity) {
                Ok(state) => with_cities(storage, state).map(Some),
                Err(_) => Ok(None),
            },
            None => Ok(None),
        }
    })?;

    Ok(Html(pages::state_detail(found.as_ref())))
}

/// GET /hbnb_filters
async fn hbnb_filters(AxumState(app): AxumState<AppState>) -> Result<Html<String>, AppError> {
    let (states, amenities) = app.with_storage(|storage| {
        Ok((states_with_cities(storage)?, sorted_amenities(storage)?))
    })?;

    Ok(Html(pages::hbnb_filters(&states, &amenities)))
}

/// GET /hbnb
async fn hbnb(AxumState(app): AxumState<AppState>) -> Result<Html<String>, AppError> {
    let (states, amenities, places) = app.with_storage(|storage| {
        Ok((
            states_with_cities(storage)?,
            sorted_amenities(storage)?,
            places_with_owners(storage)?,
        ))
    })?;

    Ok(Html(pages::hbnb(&states, &amenities, &places)))
}

pub fn router(storage: Box<dyn Storage>) -> Router {
    Router::new()
        .route("/states_list", get(states_list))
        .route("/cities_by_states", get(cities_by_states))
        .route("/states", get(states_list))
        .route("/states/:id", get(state_detail))
        .route("/hbnb_filters", get(hbnb_filters))
        .route("/hbnb", get(hbnb))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(storage))
}

// ============================================================================
// TESTS
// ============================================================================
