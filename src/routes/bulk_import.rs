use std::collections::HashMap;

use actix_multipart::form::{bytes::Bytes as UploadedFile, MultipartForm};
use actix_session::Session;
use actix_web::{get, post, web, HttpResponse, Responder};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    errors::AppError,
    import::{ColumnMapping, PendingImport, TARGET_FIELDS},
    AppState,
};

use super::{flash, page_context, redirect, render, session_token, settle};

#[derive(MultipartForm)]
pub struct UploadForm {
    #[multipart(limit = "20MiB")]
    file: UploadedFile,
}

#[derive(Serialize)]
struct FieldRow {
    key: &'static str,
    title: &'static str,
    label: &'static str,
    selected: Option<String>,
}

fn field_rows(mapping: &ColumnMapping) -> Vec<FieldRow> {
    TARGET_FIELDS
        .iter()
        .map(|field| FieldRow {
            key: field.key,
            title: field.title,
            label: field.label,
            selected: mapping.get(field.key).map(str::to_owned),
        })
        .collect()
}

fn expired(session: &Session) -> Result<HttpResponse, AppError> {
    flash::error(session, "This upload has expired. Please choose the file again.")?;
    Ok(redirect("/inventory/import"))
}

fn mapping_location(id: &Uuid) -> String {
    format!("/inventory/import/{}", id)
}

#[get("/inventory/import")]
pub async fn upload_handler(
    state: web::Data<AppState>,
    session: Session,
) -> Result<impl Responder, AppError> {
    session_token(&session)?;
    let mut context = page_context(&session, &state, "Bulk import", "inventory");
    context.insert("step", &1);
    render("import_upload.html", &context)
}

#[post("/inventory/import/preview")]
pub async fn preview_handler(
    state: web::Data<AppState>,
    session: Session,
    MultipartForm(form): MultipartForm<UploadForm>,
) -> Result<impl Responder, AppError> {
    let token = session_token(&session)?;
    let file = form.file;
    if file.data.is_empty() {
        flash::error(&session, "Choose a spreadsheet to import")?;
        return Ok(redirect("/inventory/import"));
    }

    let file_name = file.file_name.unwrap_or_else(|| "import.xlsx".to_owned());
    let content_type = file
        .content_type
        .map(|m| m.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_owned());
    let bytes = file.data.to_vec();

    let preview = state
        .api
        .import_preview(&token, &file_name, &content_type, bytes.clone())
        .await;
    match preview {
        Ok(preview) => {
            log::info!(
                "Previewed {} with {} columns",
                file_name,
                preview.headers.len()
            );
            let id = state
                .imports
                .insert(PendingImport::new(file_name, content_type, bytes, preview))
                .await;
            Ok(redirect(&mapping_location(&id)))
        }
        Err(e) => {
            settle(&session, Err(e), None, "Failed to read the file")?;
            Ok(redirect("/inventory/import"))
        }
    }
}

#[get("/inventory/import/{id}")]
pub async fn mapping_handler(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    session_token(&session)?;
    let id = path.into_inner();
    let Some(pending) = state.imports.get(&id).await else {
        return expired(&session);
    };

    let mapping = pending.mapping().await;
    let mut context = page_context(&session, &state, "Bulk import", "inventory");
    context.insert("step", &2);
    context.insert("import_id", &id);
    context.insert("file_name", &pending.file_name);
    context.insert("headers", &pending.preview.headers);
    context.insert("fields", &field_rows(&mapping));
    context.insert("mapped", &mapping.mapped_count());
    context.insert("field_count", &TARGET_FIELDS.len());
    render("import_mapping.html", &context)
}

#[post("/inventory/import/{id}/review")]
pub async fn review_handler(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<Uuid>,
    web::Form(selections): web::Form<HashMap<String, String>>,
) -> Result<impl Responder, AppError> {
    session_token(&session)?;
    let id = path.into_inner();
    let Some(pending) = state.imports.get(&id).await else {
        return expired(&session);
    };

    let mapping = ColumnMapping::from_selections(&selections);
    if mapping.mapped_count() == 0 {
        flash::error(&session, "Map at least one column to continue")?;
        return Ok(redirect(&mapping_location(&id)));
    }
    pending.remember(mapping.clone()).await;

    let mut context = page_context(&session, &state, "Bulk import", "inventory");
    context.insert("step", &3);
    context.insert("import_id", &id);
    context.insert("file_name", &pending.file_name);
    context.insert("headers", &pending.preview.headers);
    context.insert("rows", &pending.preview.sample_rows());
    context.insert("fields", &field_rows(&mapping));
    render("import_review.html", &context)
}

#[post("/inventory/import/{id}/commit")]
pub async fn commit_handler(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<Uuid>,
    web::Form(selections): web::Form<HashMap<String, String>>,
) -> Result<impl Responder, AppError> {
    let token = session_token(&session)?;
    let id = path.into_inner();
    let Some(pending) = state.imports.get(&id).await else {
        return expired(&session);
    };

    let mapping = ColumnMapping::from_selections(&selections);
    if mapping.mapped_count() == 0 {
        flash::error(&session, "Map at least one column to continue")?;
        return Ok(redirect(&mapping_location(&id)));
    }
    pending.remember(mapping.clone()).await;

    let committed = settle(
        &session,
        state.api.import_commit(&token, &pending, &mapping).await,
        Some("Import complete"),
        "Failed to import the data",
    )?;
    if committed {
        state.imports.remove(&id).await;
        log::info!("Imported {} ({} columns mapped)", pending.file_name, mapping.mapped_count());
        Ok(redirect("/inventory"))
    } else {
        Ok(redirect(&mapping_location(&id)))
    }
}
