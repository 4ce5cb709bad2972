pub mod nominatim;
