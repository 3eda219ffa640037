mod tests_sparse_index;
