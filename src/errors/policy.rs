use thiserror::Error;

/// Parse failures in the `@action=allow` remap-text mini-language and the
/// profile-parameter allow lists.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AclError {
    /// The allow directive carried no address tokens.
    #[error("allow directive has no address tokens: '{directive}'")]
    MissingTokens { directive: String },

    /// A token parsed as neither an address nor a range.
    #[error("invalid address '{token}'")]
    InvalidAddress { token: String },

    /// A range mixed an IPv4 endpoint with an IPv6 endpoint.
    #[error("address family mismatch in range '{token}'")]
    MixedFamilies { token: String },

    /// An allow-IP parameter value was not a valid address or CIDR.
    #[error("invalid allow-IP parameter entry '{value}'")]
    InvalidParameter { value: String },
}

/// Parse failures in the line-oriented header-rewrite mini-language.
///
/// These are structural: the assembler aborts the whole run on any of them.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderRewriteError {
    /// A line had too few tokens for its directive.
    #[error("malformed line '{line}'")]
    MalformedLine { line: String },

    /// A line began with a directive the language does not define.
    #[error("unknown directive '{directive}' in line '{line}'")]
    UnknownDirective { directive: String, line: String },
}
