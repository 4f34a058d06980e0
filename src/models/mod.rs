pub mod wilayah;
