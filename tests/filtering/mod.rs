mod free_fall;
mod input_driven;
mod nonlinear;
