pub mod technicians;
