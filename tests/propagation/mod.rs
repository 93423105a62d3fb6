pub mod support;

mod events;
mod jet;
mod kepler;
mod nbody;
