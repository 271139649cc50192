mod support;

mod execution;
mod filtering;
mod hooks;
