pub mod wilayah_controller;
