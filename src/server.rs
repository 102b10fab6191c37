use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use chrono::{DateTime, Utc};
use rocket::{
    fairing::{Fairing, Info, Kind},
    fs::NamedFile,
    get,
    http::{ContentType, Header, Status},
    options, routes,
    serde::json::Json,
    Build, Request, Response, Rocket, State,
};
use serde_derive::Serialize;

use crate::{
    data_types::{
        progress::{Progress, ProgressRecord, RecordStatus},
        route::LatLng,
        vessel::Direction,
    },
    error::FerryError,
    processors::route_model::RouteModel,
    tracking::QuerySurface,
    FerryTracker,
};

pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Cross-Origin-Resource-Sharing Fairing",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new("Access-Control-Allow-Methods", "GET, HEAD, OPTIONS"));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
    }
}

/// What `/progress` reports for one vessel.
#[derive(Debug, Serialize)]
pub struct VesselProgress {
    pub name: String,
    pub progress: Progress,
    pub status: RecordStatus,
    pub direction: Direction,
    pub at_dock: bool,
    pub last_updated: Option<DateTime<Utc>>,
}

impl VesselProgress {
    fn from_record(record: &ProgressRecord, last_updated: Option<DateTime<Utc>>) -> Self {
        Self {
            name: record.vessel_name.clone(),
            progress: record.progress,
            status: record.status(),
            direction: record.direction,
            at_dock: record.at_dock,
            last_updated,
        }
    }
}

/// Cache health for the debug page.
#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub last_updated: Option<DateTime<Utc>>,
    pub age_seconds: Option<f64>,
    pub vessels: usize,
    pub defaulted: usize,
    pub minimum_ferries: usize,
    pub requests: u64,
}

struct DebugSettings {
    route: Arc<RouteModel>,
    page_path: PathBuf,
}

#[options("/<_..>")]
fn all_options() {
    /* Intentionally left empty */
}

#[get("/progress")]
fn progress(query: &State<QuerySurface>) -> Json<BTreeMap<String, VesselProgress>> {
    let snapshot = query.progress();

    Json(
        snapshot
            .records
            .iter()
            .map(|(key, record)| (key.clone(), VesselProgress::from_record(record, snapshot.last_updated)))
            .collect(),
    )
}

#[get("/debug")]
async fn debug_page(debug: &State<DebugSettings>) -> Option<NamedFile> {
    NamedFile::open(&debug.page_path).await.ok()
}

#[get("/debug/status")]
fn debug_status(query: &State<QuerySurface>) -> Json<ServiceStatus> {
    let snapshot = query.progress();

    Json(ServiceStatus {
        last_updated: snapshot.last_updated,
        age_seconds: snapshot.age_seconds(Utc::now()),
        vessels: snapshot.len(),
        defaulted: snapshot.defaulted_count(),
        minimum_ferries: query.minimum_ferries(),
        requests: query.request_count(),
    })
}

#[get("/debug/get/<vessel>")]
fn debug_vessel(vessel: &str, query: &State<QuerySurface>) -> Option<Json<ProgressRecord>> {
    query.vessel(vessel).map(Json)
}

#[get("/debug/path/coords")]
fn debug_path_coords(debug: &State<DebugSettings>) -> Json<Vec<LatLng>> {
    Json(
        debug
            .route
            .coordinates()
            .iter()
            .map(|coord| [coord.y, coord.x])
            .collect(),
    )
}

#[get("/debug/path/polyline")]
fn debug_path_polyline(debug: &State<DebugSettings>) -> (Status, (ContentType, String)) {
    match debug.route.polyline() {
        Ok(encoded) => (Status::Ok, (ContentType::Text, encoded)),
        Err(e) => (Status::InternalServerError, (ContentType::Text, e)),
    }
}

/// Builds the HTTP server for `tracker`. The debug routes exist only when
/// `debug_mode` is set.
pub fn build_rocket(tracker: &FerryTracker) -> Result<Rocket<Build>, FerryError> {
    let config = tracker.config();
    let (address, port) = config.bind_address()?;

    let figment = rocket::Config::figment()
        .merge(("address", address))
        .merge(("port", port));

    let mut rocket = rocket::custom(figment)
        .attach(Cors)
        .manage(tracker.query_surface())
        .mount("/", routes![progress, all_options]);

    if config.debug_mode {
        rocket = rocket
            .manage(DebugSettings {
                route: Arc::clone(tracker.route()),
                page_path: config.debug_page_path.clone(),
            })
            .mount(
                "/",
                routes![
                    debug_page,
                    debug_status,
                    debug_vessel,
                    debug_path_coords,
                    debug_path_polyline
                ],
            );
    }

    Ok(rocket)
}
