#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub code_num: u16,
    pub message: &'static str,
}

impl Status {
    pub const OK: Status = Status {
        code_num: 200,
        message: "OK",
    };
    pub const MOVED_PERMANENTLY: Status = Status {
        code_num: 301,
        message: "Moved Permanently",
    };
    pub const NOT_MODIFIED: Status = Status {
        code_num: 304,
        message: "Not Modified",
    };
    pub const BAD_REQUEST: Status = Status {
        code_num: 400,
        message: "Bad Request",
    };
    pub const NOT_FOUND: Status = Status {
        code_num: 404,
        message: "Not Found",
    };
    pub const URI_TOO_LONG: Status = Status {
        code_num: 414,
        message: "URI Too Long",
    };
    pub const HEADER_FIELDS_TOO_LARGE: Status = Status {
        code_num: 431,
        message: "Request Header Fields Too Large",
    };
    pub const NOT_IMPLEMENTED: Status = Status {
        code_num: 501,
        message: "Not Implemented",
    };
    pub const HTTP_VERSION_NOT_SUPPORTED: Status = Status {
        code_num: 505,
        message: "HTTP Version Not Supported",
    };
}
