//wilayah_controller.rs
use actix_web::{Error, HttpResponse, Responder, get, web};
use sqlx::mysql::MySqlPool;

use crate::models::wilayah::{Level, Wilayah};

fn query_for(level: Level) -> &'static str {
    match level {
        Level::Provinsi => {
            "SELECT kode AS code, nama AS name, CAST(NULL AS CHAR) AS parent_code, CAST(NULL AS CHAR) AS postal_code
             FROM provinsi ORDER BY kode"
        }
        Level::Kabupaten => {
            "SELECT kode AS code, nama AS name, kode_provinsi AS parent_code, CAST(NULL AS CHAR) AS postal_code
             FROM kabupaten WHERE kode_provinsi = ? ORDER BY kode"
        }
        Level::Kecamatan => {
            "SELECT kode AS code, nama AS name, kode_kabupaten AS parent_code, CAST(NULL AS CHAR) AS postal_code
             FROM kecamatan WHERE kode_kabupaten = ? ORDER BY kode"
        }
        Level::Desa => {
            "SELECT kode AS code, nama AS name, kode_kecamatan AS parent_code, kode_pos AS postal_code
             FROM desa WHERE kode_kecamatan = ? ORDER BY kode"
        }
    }
}

/// Trimmed parent code from the path, rejecting blanks.
pub fn parent_code(raw: &str) -> Result<&str, Error> {
    let code = raw.trim();
    if code.is_empty() {
        return Err(actix_web::error::ErrorBadRequest("Kode induk wajib diisi"));
    }
    Ok(code)
}

async fn list_children(
    pool: &MySqlPool,
    level: Level,
    parent: &str,
) -> Result<Vec<Wilayah>, Error> {
    sqlx::query_as::<_, Wilayah>(query_for(level))
        .bind(parent)
        .fetch_all(pool)
        .await
        .map_err(|e| {
            log::error!("Gagal mengambil {} untuk induk {}: {:?}", level, parent, e);
            actix_web::error::ErrorInternalServerError(e)
        })
}

//provinsi
#[get("/api/wilayah/provinsi")]
pub async fn get_provinsi(pool: web::Data<MySqlPool>) -> Result<impl Responder, Error> {
    let provinsi: Vec<Wilayah> = sqlx::query_as::<_, Wilayah>(query_for(Level::Provinsi))
        .fetch_all(pool.get_ref())
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(provinsi))
}

//kabupaten per provinsi
#[get("/api/wilayah/kabupaten/{kode_provinsi}")]
pub async fn get_kabupaten(
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> Result<impl Responder, Error> {
    let kode_provinsi = path.into_inner();
    let kabupaten = list_children(&pool, Level::Kabupaten, parent_code(&kode_provinsi)?).await?;
    Ok(HttpResponse::Ok().json(kabupaten))
}

//kecamatan per kabupaten
#[get("/api/wilayah/kecamatan/{kode_kabupaten}")]
pub async fn get_kecamatan(
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> Result<impl Responder, Error> {
    let kode_kabupaten = path.into_inner();
    let kecamatan = list_children(&pool, Level::Kecamatan, parent_code(&kode_kabupaten)?).await?;
    Ok(HttpResponse::Ok().json(kecamatan))
}

//desa per kecamatan, termasuk kode pos
#[get("/api/wilayah/desa/{kode_kecamatan}")]
pub async fn get_desa(
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> Result<impl Responder, Error> {
    let kode_kecamatan = path.into_inner();
    let desa = list_children(&pool, Level::Desa, parent_code(&kode_kecamatan)?).await?;
    Ok(HttpResponse::Ok().json(desa))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_provinsi)
        .service(get_kabupaten)
        .service(get_kecamatan)
        .service(get_desa);
}
