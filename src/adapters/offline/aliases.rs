//! Well-known modules whose distribution uses a different name.

/// `(module, package)` pairs for popular packages whose import name does
/// not match their published name.
pub const KNOWN_ALIASES: &[(&str, &str)] = &[
    ("Crypto", "pycryptodome"),
    ("MySQLdb", "mysqlclient"),
    ("OpenSSL", "pyOpenSSL"),
    ("PIL", "Pillow"),
    ("attr", "attrs"),
    ("bs4", "beautifulsoup4"),
    ("cv2", "opencv-python"),
    ("dateutil", "python-dateutil"),
    ("dns", "dnspython"),
    ("docx", "python-docx"),
    ("dotenv", "python-dotenv"),
    ("fitz", "PyMuPDF"),
    ("git", "GitPython"),
    ("google", "protobuf"),
    ("jose", "python-jose"),
    ("jwt", "PyJWT"),
    ("magic", "python-magic"),
    ("multipart", "python-multipart"),
    ("psycopg2", "psycopg2-binary"),
    ("serial", "pyserial"),
    ("sklearn", "scikit-learn"),
    ("skimage", "scikit-image"),
    ("slugify", "python-slugify"),
    ("usb", "pyusb"),
    ("win32api", "pywin32"),
    ("yaml", "PyYAML"),
    ("zmq", "pyzmq"),
];

/// Published packages whose import name matches their own name.
pub const KNOWN_PACKAGES: &[&str] = &[
    "aiohttp",
    "boto3",
    "celery",
    "click",
    "django",
    "fastapi",
    "flask",
    "httpx",
    "jinja2",
    "lxml",
    "matplotlib",
    "numpy",
    "pandas",
    "pydantic",
    "pytest",
    "redis",
    "requests",
    "scipy",
    "sqlalchemy",
    "typer",
    "urllib3",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_modules_are_unique() {
        let mut modules: Vec<&str> = KNOWN_ALIASES.iter().map(|(m, _)| *m).collect();
        let len = modules.len();
        modules.sort_unstable();
        modules.dedup();
        assert_eq!(modules.len(), len);
    }
}
