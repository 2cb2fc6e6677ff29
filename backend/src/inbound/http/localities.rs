//! Locality lookup handlers.
//!
//! ```text
//! GET /api/v1/localities?q=
//! GET /api/v1/localities/{id}/neighbourhoods
//! ```

use actix_web::{HttpResponse, get, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    Error, Locality, LocalityCatalogue, LocalityChoice, LocalityId, Neighbourhood, Selection,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// Optional name filter.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct LocalityQuery {
    /// Case-insensitive substring of the locality name.
    pub q: Option<String>,
}

/// Locality as listed in the form's dropdown.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocalityResponse {
    #[schema(example = 1)]
    pub id: u32,
    #[schema(example = "CORDOBA CAPITAL")]
    pub name: String,
    /// Whether the form must ask for a neighbourhood.
    pub requires_neighbourhood: bool,
}

impl LocalityResponse {
    fn new(locality: &Locality, catalogue: &LocalityCatalogue) -> Self {
        let choice: LocalityChoice = Selection::known(locality.id);
        Self {
            id: locality.id.get(),
            name: locality.name.clone(),
            requires_neighbourhood: catalogue.requires_neighbourhood(&choice),
        }
    }
}

/// Neighbourhood as listed in the form's dropdown.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NeighbourhoodResponse {
    #[schema(example = 107)]
    pub id: u32,
    #[schema(example = "NUEVA CORDOBA")]
    pub name: String,
}

impl From<&Neighbourhood> for NeighbourhoodResponse {
    fn from(value: &Neighbourhood) -> Self {
        Self {
            id: value.id.get(),
            name: value.name.clone(),
        }
    }
}

/// List localities, optionally filtered by name.
#[utoipa::path(
    get,
    path = "/api/v1/localities",
    params(LocalityQuery),
    responses(
        (status = 200, description = "Matching localities", body = [LocalityResponse])
    ),
    tags = ["localities"],
    operation_id = "listLocalities"
)]
#[get("/localities")]
pub async fn list_localities(
    state: web::Data<HttpState>,
    query: web::Query<LocalityQuery>,
) -> HttpResponse {
    let needle = query.q.as_deref().unwrap_or_default();
    let catalogue = state.catalogue.as_ref();
    let body: Vec<LocalityResponse> = catalogue
        .search(needle)
        .into_iter()
        .map(|locality| LocalityResponse::new(locality, catalogue))
        .collect();
    HttpResponse::Ok().json(body)
}

/// List the neighbourhoods of one locality.
#[utoipa::path(
    get,
    path = "/api/v1/localities/{id}/neighbourhoods",
    params(("id" = u32, Path, description = "Locality identifier")),
    responses(
        (status = 200, description = "Neighbourhoods in display order", body = [NeighbourhoodResponse]),
        (status = 404, description = "Unknown locality", body = Error)
    ),
    tags = ["localities"],
    operation_id = "listNeighbourhoods"
)]
#[get("/localities/{id}/neighbourhoods")]
pub async fn list_neighbourhoods(
    state: web::Data<HttpState>,
    path: web::Path<u32>,
) -> ApiResult<HttpResponse> {
    let id = LocalityId::new(path.into_inner());
    let neighbourhoods = state
        .catalogue
        .neighbourhoods(id)
        .ok_or_else(|| Error::not_found(format!("unknown locality {id}")))?;
    let body: Vec<NeighbourhoodResponse> = neighbourhoods.iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}
