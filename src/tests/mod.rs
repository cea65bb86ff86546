mod end_to_end_test;
mod pipeline_test;
