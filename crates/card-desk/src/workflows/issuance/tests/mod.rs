mod cards;
mod common;
