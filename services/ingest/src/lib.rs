pub mod arcgis;
pub mod sync;
