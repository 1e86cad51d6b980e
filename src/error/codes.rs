/// Error code registry for tabclean
///
/// Error codes are organized by the stage that raises them:
/// - 1000-1999: Load errors
/// - 2000-2999: Clean errors
/// - 3000-3999: Derive errors
/// - 4000-4999: Aggregate errors
/// - 5000-5999: Configuration errors
/// - 6000-6999: Chart and statistics collaborator errors
/// - 9000-9999: Other errors
#[allow(dead_code)]
pub struct ErrorCode;

impl ErrorCode {
    // Load errors (1000-1999)
    pub const LOAD_NOT_FOUND: u16 = 1001;
    pub const LOAD_FIELD_COUNT: u16 = 1002;
    pub const LOAD_MALFORMED: u16 = 1003;
    pub const LOAD_EMPTY_HEADER: u16 = 1004;
    pub const LOAD_DUPLICATE_HEADER: u16 = 1005;

    // Clean errors (2000-2999)
    pub const CLEAN_UNKNOWN_COLUMN: u16 = 2001;
    pub const CLEAN_DUPLICATE_COLUMN: u16 = 2002;
    pub const CLEAN_COERCION_FAILED: u16 = 2003;
    pub const CLEAN_INVALID_FILTER: u16 = 2004;
    pub const CLEAN_SCHEMA_MISMATCH: u16 = 2005;

    // Derive errors (3000-3999)
    pub const DERIVE_MISSING_COLUMN: u16 = 3001;
    pub const DERIVE_TYPE_MISMATCH: u16 = 3002;

    // Aggregate errors (4000-4999)
    pub const AGGREGATE_MISSING_COLUMN: u16 = 4001;
    pub const AGGREGATE_EMPTY_GROUP_BY: u16 = 4002;
    pub const AGGREGATE_SHARE_NEEDS_TWO_LEVELS: u16 = 4003;
    pub const AGGREGATE_NON_NUMERIC: u16 = 4004;
    pub const AGGREGATE_UNKNOWN_SORT_KEY: u16 = 4005;

    // Configuration errors (5000-5999)
    pub const CONFIG_NOT_FOUND: u16 = 5001;
    pub const CONFIG_INVALID_YAML: u16 = 5002;
    pub const CONFIG_INVALID_TOML: u16 = 5003;
    pub const CONFIG_UNSUPPORTED_FORMAT: u16 = 5004;
    pub const CONFIG_INVALID_VALUE: u16 = 5005;

    // Collaborator errors (6000-6999)
    pub const CHART_MISSING_COLUMN: u16 = 6001;
    pub const CHART_INVALID_SPEC: u16 = 6002;
    pub const MODEL_MISSING_COLUMN: u16 = 6003;
    pub const MODEL_TYPE_MISMATCH: u16 = 6004;
    pub const MODEL_INVALID_SPEC: u16 = 6005;

    // Other errors (9000-9999)
    pub const IO_ERROR: u16 = 9001;
    pub const EXPORT_FAILED: u16 = 9002;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        ErrorCode::LOAD_NOT_FOUND => "Input file does not exist",
        ErrorCode::LOAD_FIELD_COUNT => "Row field count differs from the header",
        ErrorCode::LOAD_MALFORMED => "Input is not valid delimited text",
        ErrorCode::LOAD_EMPTY_HEADER => "Input has no header row",
        ErrorCode::LOAD_DUPLICATE_HEADER => "Header names a column twice",

        ErrorCode::CLEAN_UNKNOWN_COLUMN => "Rule names a column that is not in the table",
        ErrorCode::CLEAN_DUPLICATE_COLUMN => "Rename target already exists",
        ErrorCode::CLEAN_COERCION_FAILED => "Value cannot be converted to the target type",
        ErrorCode::CLEAN_INVALID_FILTER => "Filter expression could not be parsed",
        ErrorCode::CLEAN_SCHEMA_MISMATCH => "Row does not match the table schema",

        ErrorCode::DERIVE_MISSING_COLUMN => "Derivation references an absent column",
        ErrorCode::DERIVE_TYPE_MISMATCH => "Derivation input has an unexpected type",

        ErrorCode::AGGREGATE_MISSING_COLUMN => "Aggregation references an absent column",
        ErrorCode::AGGREGATE_EMPTY_GROUP_BY => "Aggregation has no group-by columns",
        ErrorCode::AGGREGATE_SHARE_NEEDS_TWO_LEVELS => {
            "Within-group percentage needs at least two group-by columns"
        }
        ErrorCode::AGGREGATE_NON_NUMERIC => "Reduction source column is not numeric",
        ErrorCode::AGGREGATE_UNKNOWN_SORT_KEY => "Sort key is not a reduction of this aggregation",

        ErrorCode::CONFIG_NOT_FOUND => "Pipeline configuration file not found",
        ErrorCode::CONFIG_INVALID_YAML => "Invalid YAML syntax",
        ErrorCode::CONFIG_INVALID_TOML => "Invalid TOML syntax",
        ErrorCode::CONFIG_UNSUPPORTED_FORMAT => "Configuration file extension not recognised",
        ErrorCode::CONFIG_INVALID_VALUE => "Configuration value is invalid",

        ErrorCode::CHART_MISSING_COLUMN => "Chart references an absent column",
        ErrorCode::CHART_INVALID_SPEC => "Chart is missing a required encoding",
        ErrorCode::MODEL_MISSING_COLUMN => "Model references an absent column",
        ErrorCode::MODEL_TYPE_MISMATCH => "Model column has the wrong type for the test",
        ErrorCode::MODEL_INVALID_SPEC => "Model has the wrong number of independent columns",

        ErrorCode::IO_ERROR => "IO operation failed",
        ErrorCode::EXPORT_FAILED => "Writing an output artifact failed",

        _ => "Unknown error code",
    }
}
