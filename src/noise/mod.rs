pub mod fractal;
pub mod perlin;
