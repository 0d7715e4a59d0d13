pub mod formatter;

pub use formatter::{
    format_age, format_record_detail, format_status_table, format_tsv, should_use_colors,
};
