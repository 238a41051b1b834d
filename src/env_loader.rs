use std::env;
use std::path::PathBuf;

fn fallback_dotenv_path(surfscan_home: Option<PathBuf>, home_dir: Option<PathBuf>) -> Option<PathBuf> {
    match (surfscan_home, home_dir) {
        (Some(root), _) => Some(root.join(".env")),
        (None, Some(home)) => Some(home.join(".surfscan").join(".env")),
        (None, None) => None,
    }
}

/// Load `.env` from the working directory, else from the SurfScan home.
pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let fallback = fallback_dotenv_path(
        env::var_os("SURFSCAN_HOME").map(PathBuf::from),
        dirs::home_dir(),
    );

    let Some(path) = fallback else {
        return;
    };
    if path.is_file() {
        let _ = dotenvy::from_path(&path);
    }
}
