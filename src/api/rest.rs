use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reply::{Json, WithStatus};
use warp::{Filter, Rejection, Reply};

use crate::error::RecordError;
use crate::patient::{Patient, PatientPayload, PatientUpdate, PatientUpdatePayload, ValidationError};
use crate::records::RecordService;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: u64 = 16 * 1024;

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

impl ApiResponse {
    pub fn success(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        ApiResponse {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }

    pub fn error(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        ApiResponse {
            status: "error".to_string(),
            message: message.into(),
            data,
        }
    }
}

type ApiReply = Result<WithStatus<Json>, Rejection>;

fn with_service(
    service: Arc<RecordService>,
) -> impl Filter<Extract = (Arc<RecordService>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&service))
}

fn reply<T: Serialize>(body: &T, status: StatusCode) -> WithStatus<Json> {
    warp::reply::with_status(warp::reply::json(body), status)
}

pub struct RestApi {
    service: Arc<RecordService>,
}

impl RestApi {
    pub fn new(service: Arc<RecordService>) -> Self {
        RestApi { service }
    }

    pub fn routes(&self) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
        self.home()
            .or(self.about())
            .or(self.view_all())
            .or(self.view_patient())
            .or(self.sort_patients())
            .or(self.create_patient())
            .or(self.edit_patient())
            .or(self.delete_patient())
            .recover(handle_rejection)
            .with(warp::log("patientdb::api"))
    }

    fn home(&self) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
        warp::path::end()
            .and(warp::get())
            .map(|| warp::reply::json(&json!({"message": "Patient Management System API."})))
    }

    fn about(&self) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
        warp::path!("about").and(warp::get()).map(|| {
            warp::reply::json(&json!({
                "message": "A fully functional API to manage patient records."
            }))
        })
    }

    fn view_all(&self) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
        warp::path!("view")
            .and(warp::get())
            .and(with_service(Arc::clone(&self.service)))
            .and_then(view_all)
    }

    fn view_patient(&self) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
        warp::path!("view" / String)
            .and(warp::get())
            .and(with_service(Arc::clone(&self.service)))
            .and_then(view_patient)
    }

    fn sort_patients(&self) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
        warp::path!("sort")
            .and(warp::get())
            .and(warp::query::<HashMap<String, String>>())
            .and(with_service(Arc::clone(&self.service)))
            .and_then(sort_patients)
    }

    fn create_patient(&self) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
        warp::path!("create")
            .and(warp::post())
            .and(warp::body::content_length_limit(MAX_BODY_BYTES))
            .and(warp::body::bytes())
            .and(with_service(Arc::clone(&self.service)))
            .and_then(create_patient)
    }

    fn edit_patient(&self) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
        warp::path!("edit" / String)
            .and(warp::put())
            .and(warp::body::content_length_limit(MAX_BODY_BYTES))
            .and(warp::body::bytes())
            .and(with_service(Arc::clone(&self.service)))
            .and_then(edit_patient)
    }

    fn delete_patient(&self) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
        warp::path!("delete" / String)
            .and(warp::delete())
            .and(with_service(Arc::clone(&self.service)))
            .and_then(delete_patient)
    }
}

/// Run a store-backed operation on the blocking pool; file I/O and the store
/// lock never park an async worker.
async fn blocking<T, F>(service: Arc<RecordService>, op: F) -> Result<T, RecordError>
where
    F: FnOnce(&RecordService) -> Result<T, RecordError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || op(&service))
        .await
        .map_err(|e| RecordError::Internal(format!("task join error: {}", e)))?
}

/// Path segments arrive percent-encoded.
fn decode_id(raw: &str) -> Result<String, RecordError> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|id| id.into_owned())
        .map_err(|_| RecordError::InvalidArgument(format!("patient id '{}' is not valid UTF-8", raw)))
}

async fn view_all(service: Arc<RecordService>) -> ApiReply {
    match blocking(service, |s| s.list()).await {
        Ok(views) => Ok(reply(&views, StatusCode::OK)),
        Err(err) => Ok(error_reply(err)),
    }
}

async fn view_patient(patient_id: String, service: Arc<RecordService>) -> ApiReply {
    let id = match decode_id(&patient_id) {
        Ok(id) => id,
        Err(err) => return Ok(error_reply(err)),
    };

    match blocking(service, move |s| s.get(&id)).await {
        Ok(view) => Ok(reply(&view, StatusCode::OK)),
        Err(err) => Ok(error_reply(err)),
    }
}

async fn sort_patients(params: HashMap<String, String>, service: Arc<RecordService>) -> ApiReply {
    let sort_by = match params.get("sort_by") {
        Some(sort_by) => sort_by.clone(),
        None => {
            return Ok(error_reply(RecordError::Validation(ValidationError::field(
                "sort_by",
                "required query parameter",
            ))))
        }
    };
    let order = params.get("order").cloned().unwrap_or_else(|| "asc".to_string());

    match blocking(service, move |s| s.sorted(&sort_by, &order)).await {
        Ok(views) => Ok(reply(&views, StatusCode::OK)),
        Err(err) => Ok(error_reply(err)),
    }
}

async fn create_patient(body: Bytes, service: Arc<RecordService>) -> ApiReply {
    let patient = match parse_body::<PatientPayload, Patient>(&body) {
        Ok(patient) => patient,
        Err(err) => return Ok(error_reply(err)),
    };

    match blocking(service, move |s| s.create(patient)).await {
        Ok(view) => {
            let response = ApiResponse::success(
                "Patient created successfully.",
                serde_json::to_value(&view).ok(),
            );
            Ok(reply(&response, StatusCode::CREATED))
        }
        Err(err) => Ok(error_reply(err)),
    }
}

async fn edit_patient(
    patient_id: String,
    body: Bytes,
    service: Arc<RecordService>,
) -> ApiReply {
    let id = match decode_id(&patient_id) {
        Ok(id) => id,
        Err(err) => return Ok(error_reply(err)),
    };
    let update = match parse_body::<PatientUpdatePayload, PatientUpdate>(&body) {
        Ok(update) => update,
        Err(err) => return Ok(error_reply(err)),
    };

    match blocking(service, move |s| s.update(&id, &update)).await {
        Ok(view) => {
            let response = ApiResponse::success("Patient updated.", serde_json::to_value(&view).ok());
            Ok(reply(&response, StatusCode::OK))
        }
        Err(err) => Ok(error_reply(err)),
    }
}

async fn delete_patient(patient_id: String, service: Arc<RecordService>) -> ApiReply {
    let id = match decode_id(&patient_id) {
        Ok(id) => id,
        Err(err) => return Ok(error_reply(err)),
    };

    match blocking(service, move |s| s.delete(&id)).await {
        Ok(()) => Ok(reply(&ApiResponse::success("Patient deleted.", None), StatusCode::OK)),
        Err(err) => Ok(error_reply(err)),
    }
}

/// Deserialize the wire payload `P`, then check it into the domain type `T`.
fn parse_body<P, T>(body: &[u8]) -> Result<T, RecordError>
where
    P: DeserializeOwned,
    T: TryFrom<P, Error = ValidationError>,
{
    let payload: P = serde_json::from_slice(body)
        .map_err(|e| RecordError::Validation(ValidationError::Malformed(e.to_string())))?;
    Ok(T::try_from(payload)?)
}

pub fn status_for(err: &RecordError) -> StatusCode {
    match err {
        RecordError::NotFound(_) => StatusCode::NOT_FOUND,
        RecordError::AlreadyExists(_) => StatusCode::BAD_REQUEST,
        RecordError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RecordError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        RecordError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        RecordError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_reply(err: RecordError) -> WithStatus<Json> {
    let status = status_for(&err);

    let response = match &err {
        RecordError::Storage(e) => {
            log::error!("Storage failure: {}", e);
            ApiResponse::error("Internal storage error", None)
        }
        RecordError::Internal(e) => {
            log::error!("{}", e);
            ApiResponse::error("Internal server error", None)
        }
        RecordError::Validation(e) => {
            log::warn!("Rejected record: {}", e);
            let violations = e.violations();
            let data = (!violations.is_empty()).then(|| json!(violations));
            ApiResponse::error(err.to_string(), data)
        }
        _ => {
            log::warn!("{}", err);
            ApiResponse::error(err.to_string(), None)
        }
    };

    reply(&response, status)
}

async fn handle_rejection(rejection: Rejection) -> Result<WithStatus<Json>, Infallible> {
    let (status, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "Route not found".to_string())
    } else if let Some(e) = rejection.find::<warp::reject::MethodNotAllowed>() {
        (StatusCode::METHOD_NOT_ALLOWED, e.to_string())
    } else if let Some(e) = rejection.find::<warp::reject::PayloadTooLarge>() {
        (StatusCode::PAYLOAD_TOO_LARGE, e.to_string())
    } else if let Some(e) = rejection.find::<warp::reject::LengthRequired>() {
        (StatusCode::LENGTH_REQUIRED, e.to_string())
    } else if let Some(e) = rejection.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else {
        log::error!("Unhandled rejection: {:?}", rejection);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    };

    Ok(reply(&ApiResponse::error(message, None), status))
}
