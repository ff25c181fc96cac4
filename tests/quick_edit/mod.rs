mod cleanup_failures;
mod forward_failures;
mod lightshow_copy;
mod loop_reuse;
