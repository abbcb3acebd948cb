use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        DefaultBodyLimit, Multipart, OriginalUri, Path, Query, State,
    },
    http::{StatusCode, Uri},
    routing::{get, patch, post, put},
    Json, Router,
};
use billmanager_core::{
    import_csv, BillRequest, BillSearch, BillView, ImportSummary, PaginatedResponse,
    RegisterUserRequest, UserView,
};
use billmanager_repository::BillSort;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

type Shared = State<Arc<AppState>>;

pub fn router(state: AppState) -> Router {
    let max_upload_bytes = state.max_upload_bytes;

    Router::new()
        .route("/api/users/register", post(register_user))
        .route("/api/bill/create", post(create_bill))
        .route("/api/bill/update/{id}", put(update_bill))
        .route("/api/bill/status/{id}/{new_status}", patch(update_bill_status))
        .route("/api/bill/search-bills", get(search_bills))
        .route("/api/bill/amount-by-period", get(amount_by_period))
        .route("/api/bill/csv/import", post(import_bills))
        .route("/api/bill/{id}", get(get_bill))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(Arc::new(state))
}

fn bad_body(rejection: JsonRejection, uri: &Uri) -> ApiError {
    ApiError::bad_request(rejection.body_text(), uri)
}

fn bad_query(rejection: QueryRejection, uri: &Uri) -> ApiError {
    ApiError::bad_request(rejection.body_text(), uri)
}

fn bad_path(rejection: PathRejection, uri: &Uri) -> ApiError {
    ApiError::bad_request(rejection.body_text(), uri)
}

async fn register_user(
    State(state): Shared,
    OriginalUri(uri): OriginalUri,
    payload: Result<Json<RegisterUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserView>), ApiError> {
    let Json(request) = payload.map_err(|err| bad_body(err, &uri))?;
    let user = state
        .bills
        .users()
        .register(&request)
        .await
        .map_err(|err| ApiError::from_bill_error(err, &uri))?;
    Ok((StatusCode::CREATED, Json(UserView::from(&user))))
}

async fn create_bill(
    State(state): Shared,
    OriginalUri(uri): OriginalUri,
    payload: Result<Json<BillRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BillView>), ApiError> {
    let Json(request) = payload.map_err(|err| bad_body(err, &uri))?;
    let creation = request
        .into_creation()
        .map_err(|err| ApiError::from_bill_error(err, &uri))?;
    let bill = state
        .bills
        .create(&creation)
        .await
        .map_err(|err| ApiError::from_bill_error(err, &uri))?;
    Ok((StatusCode::CREATED, Json(bill)))
}

async fn update_bill(
    State(state): Shared,
    OriginalUri(uri): OriginalUri,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<BillRequest>, JsonRejection>,
) -> Result<Json<BillView>, ApiError> {
    let Path(id) = id.map_err(|err| bad_path(err, &uri))?;
    let Json(request) = payload.map_err(|err| bad_body(err, &uri))?;
    let update = request
        .into_update()
        .map_err(|err| ApiError::from_bill_error(err, &uri))?;
    state
        .bills
        .update(id, &update)
        .await
        .map(Json)
        .map_err(|err| ApiError::from_bill_error(err, &uri))
}

async fn update_bill_status(
    State(state): Shared,
    OriginalUri(uri): OriginalUri,
    path: Result<Path<(i64, String)>, PathRejection>,
) -> Result<Json<BillView>, ApiError> {
    let Path((id, new_status)) = path.map_err(|err| bad_path(err, &uri))?;
    state
        .bills
        .update_status(id, &new_status)
        .await
        .map(Json)
        .map_err(|err| ApiError::from_bill_error(err, &uri))
}

async fn get_bill(
    State(state): Shared,
    OriginalUri(uri): OriginalUri,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<BillView>, ApiError> {
    let Path(id) = id.map_err(|err| bad_path(err, &uri))?;
    state
        .bills
        .get_by_id(id)
        .await
        .map(Json)
        .map_err(|err| ApiError::from_bill_error(err, &uri))
}

fn default_size() -> u32 {
    billmanager_core::bills::DEFAULT_PAGE_SIZE
}

fn default_sort() -> String {
    BillSort::default().as_str().to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchParams {
    due_date: NaiveDate,
    description: String,
    #[serde(default)]
    page: u32,
    #[serde(default = "default_size")]
    size: u32,
    #[serde(default = "default_sort")]
    sort: String,
}

async fn search_bills(
    State(state): Shared,
    OriginalUri(uri): OriginalUri,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<PaginatedResponse<BillView>>, ApiError> {
    let Query(params) = params.map_err(|err| bad_query(err, &uri))?;
    let search = BillSearch {
        due_date: params.due_date,
        description: params.description,
        page: params.page,
        size: params.size,
        sort: params.sort,
    };
    state
        .bills
        .search(&search)
        .await
        .map(Json)
        .map_err(|err| ApiError::from_bill_error(err, &uri))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PeriodParams {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

async fn amount_by_period(
    State(state): Shared,
    OriginalUri(uri): OriginalUri,
    params: Result<Query<PeriodParams>, QueryRejection>,
) -> Result<String, ApiError> {
    let Query(params) = params.map_err(|err| bad_query(err, &uri))?;
    state
        .bills
        .amount_by_period(params.start_date, params.end_date)
        .await
        .map(|total| total.to_string())
        .map_err(|err| ApiError::from_bill_error(err, &uri))
}

async fn import_bills(
    State(state): Shared,
    OriginalUri(uri): OriginalUri,
    multipart: Result<Multipart, axum::extract::multipart::MultipartRejection>,
) -> Result<Json<ImportSummary>, ApiError> {
    let mut multipart = multipart.map_err(|err| ApiError::bad_request(err.body_text(), &uri))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::new(err.status(), err.body_text(), &uri))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ApiError::new(err.status(), err.body_text(), &uri))?;
        info!(
            file_name = file_name.as_deref(),
            content_type = content_type.as_deref(),
            bytes = bytes.len(),
            "csv upload received"
        );
        upload = Some((content_type, bytes));
        break;
    }

    let (content_type, bytes) = upload
        .ok_or_else(|| ApiError::bad_request("Required part 'file' is not present.", &uri))?;

    import_csv(
        &state.bills,
        content_type.as_deref(),
        bytes.as_ref(),
        &state.import,
    )
    .await
    .map(Json)
    .map_err(|err| ApiError::from_bill_error(err, &uri))
}
