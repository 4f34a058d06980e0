//error.rs
use thiserror::Error;

use crate::models::wilayah::Level;

pub type Result<T, E = WilayahError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum WilayahError {
    #[error("permintaan HTTP gagal: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server mengembalikan status {status} untuk {url}")]
    Status { status: u16, url: String },

    #[error("respons tidak valid: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("kode induk wajib diisi untuk {level}")]
    MissingParent { level: Level },

    #[error("kesalahan database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("konfigurasi {key} tidak valid atau tidak ditemukan")]
    Config { key: &'static str },
}
