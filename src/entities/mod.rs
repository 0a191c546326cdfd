pub mod film;
pub mod planet;
pub mod planet_film;
