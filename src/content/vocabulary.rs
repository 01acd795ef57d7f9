//! Known function and constant names for inline code highlighting.
//!
//! The archived list discusses PHP, so the built-in vocabulary covers the core
//! and most common extension functions and constants. Deployments can extend it
//! from a plain text file.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

const BUILTIN_FUNCTIONS: &[&str] = &[
    // strings
    "addslashes", "bin2hex", "chr", "chunk_split", "explode", "implode", "join", "lcfirst",
    "ltrim", "md5", "nl2br", "number_format", "ord", "rtrim", "sha1", "sprintf", "printf",
    "vsprintf", "sscanf", "str_contains", "str_ends_with", "str_starts_with", "str_pad",
    "str_repeat", "str_replace", "str_split", "str_word_count", "strcasecmp", "strcmp",
    "strlen", "strpos", "strrev", "strrpos", "strstr", "strtolower", "strtoupper", "strtr",
    "substr", "substr_count", "substr_replace", "trim", "ucfirst", "ucwords", "wordwrap",
    "htmlspecialchars", "html_entity_decode", "htmlentities", "strip_tags", "nl_langinfo",
    "mb_strlen", "mb_substr", "mb_strtolower", "mb_strtoupper", "mb_str_split",
    "iconv", "utf8_encode", "utf8_decode",
    // regular expressions
    "preg_match", "preg_match_all", "preg_replace", "preg_replace_callback", "preg_split",
    "preg_quote", "preg_grep", "preg_last_error",
    // arrays
    "array_column", "array_combine", "array_diff", "array_fill", "array_filter",
    "array_flip", "array_intersect", "array_key_exists", "array_key_first", "array_key_last",
    "array_keys", "array_map", "array_merge", "array_pop", "array_push", "array_reduce",
    "array_reverse", "array_search", "array_shift", "array_slice", "array_splice",
    "array_sum", "array_unique", "array_unshift", "array_values", "array_walk",
    "array_is_list", "count", "in_array", "range", "sort", "rsort", "usort", "uasort",
    "uksort", "ksort", "krsort", "asort", "arsort", "compact", "extract", "list",
    "iterator_to_array", "iterator_count", "iterator_apply",
    // types and variables
    "boolval", "floatval", "intval", "strval", "settype", "gettype", "get_debug_type",
    "is_array", "is_bool", "is_callable", "is_float", "is_int", "is_integer", "is_iterable",
    "is_null", "is_numeric", "is_object", "is_resource", "is_scalar", "is_string",
    "isset", "unset", "empty", "var_dump", "var_export", "print_r", "serialize",
    "unserialize", "debug_zval_refcount", "debug_backtrace", "debug_print_backtrace",
    // functions and classes
    "call_user_func", "call_user_func_array", "func_get_args", "func_num_args",
    "function_exists", "method_exists", "property_exists", "class_exists",
    "interface_exists", "trait_exists", "enum_exists", "get_class", "get_parent_class",
    "get_object_vars", "get_class_methods", "spl_autoload_register", "spl_object_id",
    "spl_object_hash", "is_a", "is_subclass_of", "define", "defined", "constant",
    // errors
    "error_reporting", "ini_get", "ini_set", "set_error_handler", "set_exception_handler",
    "restore_error_handler", "trigger_error", "error_log", "assert",
    // files and streams
    "fopen", "fclose", "fread", "fwrite", "fgets", "feof", "fflush", "file",
    "file_exists", "file_get_contents", "file_put_contents", "is_dir", "is_file",
    "mkdir", "rmdir", "unlink", "rename", "realpath", "dirname", "basename", "pathinfo",
    "stream_get_contents", "stream_context_create", "tempnam", "sys_get_temp_dir",
    // json, math, time
    "json_encode", "json_decode", "json_last_error", "json_last_error_msg",
    "abs", "ceil", "floor", "round", "max", "min", "intdiv", "fmod", "pow", "sqrt",
    "random_int", "random_bytes", "mt_rand", "rand", "time", "microtime", "hrtime",
    "date", "mktime", "strtotime", "date_default_timezone_set", "checkdate",
    // runtime
    "exit", "die", "eval", "sleep", "usleep", "gc_collect_cycles", "memory_get_usage",
    "memory_get_peak_usage", "phpversion", "php_sapi_name", "php_uname", "version_compare",
    "extension_loaded", "get_loaded_extensions", "opcache_get_status", "ob_start",
    "ob_get_clean", "header", "setcookie", "session_start", "password_hash",
    "password_verify", "hash", "hash_hmac", "crc32", "base64_encode", "base64_decode",
    "urlencode", "urldecode", "rawurlencode", "http_build_query", "parse_str", "parse_url",
];

const BUILTIN_CONSTANTS: &[&str] = &[
    "PHP_VERSION", "PHP_MAJOR_VERSION", "PHP_MINOR_VERSION", "PHP_RELEASE_VERSION",
    "PHP_VERSION_ID", "PHP_EOL", "PHP_INT_MAX", "PHP_INT_MIN", "PHP_INT_SIZE",
    "PHP_FLOAT_EPSILON", "PHP_FLOAT_MAX", "PHP_FLOAT_MIN", "PHP_FLOAT_DIG", "PHP_OS",
    "PHP_OS_FAMILY", "PHP_SAPI", "PHP_BINARY", "PHP_MAXPATHLEN", "PHP_DEBUG", "PHP_ZTS",
    "PHP_EXTENSION_DIR", "PHP_PREFIX", "PHP_BINDIR", "PHP_LIBDIR", "PHP_DATADIR",
    "DEFAULT_INCLUDE_PATH", "PEAR_INSTALL_DIR", "PEAR_EXTENSION_DIR", "DIRECTORY_SEPARATOR",
    "PATH_SEPARATOR", "E_ERROR", "E_WARNING", "E_PARSE", "E_NOTICE", "E_CORE_ERROR",
    "E_CORE_WARNING", "E_COMPILE_ERROR", "E_COMPILE_WARNING", "E_USER_ERROR",
    "E_USER_WARNING", "E_USER_NOTICE", "E_STRICT", "E_RECOVERABLE_ERROR", "E_DEPRECATED",
    "E_USER_DEPRECATED", "E_ALL", "M_PI", "M_E", "M_SQRT2", "PHP_ROUND_HALF_UP",
    "PHP_ROUND_HALF_DOWN", "PHP_ROUND_HALF_EVEN", "PHP_ROUND_HALF_ODD", "SORT_REGULAR",
    "SORT_NUMERIC", "SORT_STRING", "SORT_FLAG_CASE", "SORT_NATURAL", "COUNT_RECURSIVE",
    "ARRAY_FILTER_USE_KEY", "ARRAY_FILTER_USE_BOTH", "JSON_PRETTY_PRINT",
    "JSON_UNESCAPED_SLASHES", "JSON_UNESCAPED_UNICODE", "JSON_THROW_ON_ERROR",
    "JSON_ERROR_NONE", "JSON_OBJECT_AS_ARRAY", "JSON_HEX_TAG", "PREG_PATTERN_ORDER",
    "PREG_SET_ORDER", "PREG_OFFSET_CAPTURE", "PREG_SPLIT_NO_EMPTY", "PREG_SPLIT_DELIM_CAPTURE",
    "ENT_QUOTES", "ENT_COMPAT", "ENT_HTML5", "ENT_NOQUOTES", "FILE_APPEND", "FILE_USE_INCLUDE_PATH",
    "LOCK_EX", "LOCK_SH", "LOCK_UN", "SEEK_SET", "SEEK_CUR", "SEEK_END", "STDIN", "STDOUT",
    "STDERR", "PASSWORD_DEFAULT", "PASSWORD_BCRYPT", "PASSWORD_ARGON2I", "PASSWORD_ARGON2ID",
    "MB_CASE_UPPER", "MB_CASE_LOWER", "MB_CASE_TITLE",
    "DATE_ATOM", "DATE_RFC2822", "DATE_ISO8601", "UPLOAD_ERR_OK", "CURLOPT_URL",
    "CURLOPT_RETURNTRANSFER",
];

/// Function and constant names eligible for `<code>` highlighting.
///
/// Function names are case-insensitive, constants are matched exactly.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    functions: HashSet<String>,
    constants: HashSet<String>,
}

impl Vocabulary {
    pub fn builtin() -> Self {
        let mut vocabulary = Self::default();
        for name in BUILTIN_FUNCTIONS {
            vocabulary.add_function(name);
        }
        for name in BUILTIN_CONSTANTS {
            vocabulary.add_constant(name);
        }
        vocabulary
    }

    pub fn add_function(&mut self, name: &str) {
        self.functions.insert(name.to_lowercase());
    }

    pub fn add_constant(&mut self, name: &str) {
        self.constants.insert(name.to_string());
    }

    /// Add identifiers listed one per line.
    ///
    /// Names ending in `()` or containing lowercase letters are functions, anything
    /// else is a constant. Blank lines and `#` comments are ignored.
    pub fn extend_from_str(&mut self, listing: &str) {
        for line in listing.lines() {
            let entry = line.trim();
            if entry.is_empty() || entry.starts_with('#') {
                continue;
            }

            if let Some(name) = entry.strip_suffix("()") {
                self.add_function(name);
            } else if entry.chars().any(|c| c.is_ascii_lowercase()) {
                self.add_function(entry);
            } else {
                self.add_constant(entry);
            }
        }
    }

    pub fn extend_from_file(&mut self, path: &Path) -> io::Result<()> {
        let listing = fs::read_to_string(path)?;
        self.extend_from_str(&listing);
        log::debug!(
            "vocabulary loaded from {}: {} functions, {} constants",
            path.display(),
            self.functions.len(),
            self.constants.len()
        );
        Ok(())
    }

    pub fn is_function(&self, name: &str) -> bool {
        self.functions.contains(&name.to_lowercase())
    }

    pub fn is_constant(&self, name: &str) -> bool {
        self.constants.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_knows_common_names() {
        let vocabulary = Vocabulary::builtin();
        assert!(vocabulary.is_function("preg_match"));
        assert!(vocabulary.is_function("STRLEN"));
        assert!(vocabulary.is_constant("PHP_INT_MAX"));
        assert!(!vocabulary.is_constant("php_int_max"));
        assert!(!vocabulary.is_function("not_a_function"));
    }

    #[test]
    fn listing_classifies_entries() {
        let mut vocabulary = Vocabulary::default();
        vocabulary.extend_from_str("# custom\nsodium_crypto_box()\nzend_hash\n\nZEND_ACC_FINAL\n");

        assert!(vocabulary.is_function("sodium_crypto_box"));
        assert!(vocabulary.is_function("zend_hash"));
        assert!(vocabulary.is_constant("ZEND_ACC_FINAL"));
        assert!(!vocabulary.is_function("# custom"));
    }
}
