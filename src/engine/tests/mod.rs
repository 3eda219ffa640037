pub mod helpers;
mod tests_flush;

mod tests_edge_cases;
