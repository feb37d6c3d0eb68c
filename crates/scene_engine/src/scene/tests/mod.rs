//! Scene-level tests driving whole frames through the headless backend

mod support;

mod rendering;
