use fsl_anat_gear_config::{DEFAULT_INPUT_NAME, GearConfig, GearPaths, load_environ};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary gear root with a job config, an input image and an environ file.
pub struct GearFixture {
    temp: TempDir,
    pub paths: GearPaths,
    pub input_path: PathBuf,
}

impl GearFixture {
    /// Fixture with an input file name containing a space.
    pub fn new(options: Value) -> Self {
        Self::with_input("T1 scan.nii.gz", options)
    }

    pub fn with_input(file_name: &str, options: Value) -> Self {
        let temp = TempDir::new().expect("tempdir");
        let root = temp.path();
        let paths = GearPaths::new(root).with_environ_path(root.join("gear_environ.json"));

        let input_dir = root.join("input").join(DEFAULT_INPUT_NAME);
        fs::create_dir_all(&input_dir).expect("input dir");
        let input_path = input_dir.join(file_name);
        fs::write(&input_path, b"nifti").expect("input");

        let config = json!({
            "config": options,
            "inputs": {
                DEFAULT_INPUT_NAME: {
                    "base": "file",
                    "hierarchy": { "type": "acquisition", "id": "000000000000000000000001" },
                    "location": {
                        "path": input_path.to_string_lossy(),
                        "name": file_name,
                    }
                }
            },
            "destination": { "type": "acquisition", "id": "000000000000000000000000" },
            "job": { "id": "000000000000000000000002" }
        });
        fs::write(
            &paths.config_path,
            serde_json::to_string_pretty(&config).expect("config json"),
        )
        .expect("config");

        let search_path = std::env::var("PATH").unwrap_or_else(|_| "/usr/bin:/bin".to_string());
        let environ = json!({ "PATH": search_path, "FSLDIR": "/opt/fsl", "FSLOUTPUTTYPE": "NIFTI_GZ" });
        fs::write(&paths.environ_path, environ.to_string()).expect("environ");

        fs::create_dir_all(&paths.output_dir).expect("output dir");
        fs::create_dir_all(&paths.work_dir).expect("work dir");

        Self {
            temp,
            paths,
            input_path,
        }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn load_config(&self) -> GearConfig {
        GearConfig::load_from_path(&self.paths.config_path).expect("load config")
    }

    pub fn environ(&self) -> BTreeMap<String, String> {
        load_environ(&self.paths.environ_path).expect("load environ")
    }

    /// Write a runtime override file next to the job config.
    pub fn write_override(&self, name: &str, contents: Value) -> PathBuf {
        let path = self.root().join(name);
        fs::write(&path, contents.to_string()).expect("override");
        path
    }
}
