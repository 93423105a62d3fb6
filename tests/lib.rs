extern crate moros;

mod propagation;
