use crate::common::*;

/// The annotation of one person in an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointRecord {
    #[serde(alias = "img_path")]
    pub image_path: PathBuf,
    /// The `[x, y, width, height]` box in source pixels.
    pub bbox: [f64; 4],
    /// Per-joint `[x, y, depth]` in source pixels, with depth in millimeters
    /// relative to the root joint.
    pub joint_img: Vec<[f64; 3]>,
    /// Per-joint `[x, y, z]` in camera space in millimeters.
    pub joint_cam: Vec<[f64; 3]>,
    pub joint_vis: Vec<f64>,
    pub root_cam: [f64; 3],
    pub f: [f64; 2],
    pub c: [f64; 2],
    #[serde(default)]
    pub img_width: Option<usize>,
    #[serde(default)]
    pub img_height: Option<usize>,
}

impl JointRecord {
    pub fn bbox(&self) -> Result<XYWH<f64>> {
        XYWH::try_from_xywh(self.bbox).with_context(|| {
            format!(
                "invalid bbox {:?} for '{}'",
                self.bbox,
                self.image_path.display()
            )
        })
    }

    /// The `[x, y]` part of the image plane joints.
    pub fn joint_img_2d(&self) -> Vec<[f64; 2]> {
        self.joint_img.iter().map(|&[x, y, _]| [x, y]).collect()
    }

    /// Checks the joint counts and the box against the dataset metadata.
    pub fn validate(&self, meta: &JointMeta) -> Result<()> {
        let joint_num = meta.joint_num();
        ensure!(
            self.joint_img.len() == joint_num
                && self.joint_cam.len() == joint_num
                && self.joint_vis.len() == joint_num,
            "expect {} joints, but get {} in joint_img, {} in joint_cam and {} in joint_vis",
            joint_num,
            self.joint_img.len(),
            self.joint_cam.len(),
            self.joint_vis.len()
        );
        self.bbox()?;
        Ok(())
    }
}

/// The per-dataset joint definitions.
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct JointMeta {
    #[getset(get = "pub")]
    name: String,
    joints_name: Vec<String>,
    /// Bones as joint index pairs, used for visualization.
    #[getset(get = "pub")]
    skeleton: Vec<[usize; 2]>,
    /// Mirrored joint index pairs.
    #[getset(get = "pub")]
    flip_pairs: Vec<[usize; 2]>,
    #[getset(get_copy = "pub")]
    joints_have_depth: bool,
}

impl JointMeta {
    pub fn new(
        name: impl Into<String>,
        joints_name: Vec<String>,
        skeleton: Vec<[usize; 2]>,
        flip_pairs: Vec<[usize; 2]>,
        joints_have_depth: bool,
    ) -> Result<Self> {
        let name = name.into();
        let joint_num = joints_name.len();
        ensure!(joint_num > 0, "dataset '{}' has no joints", name);
        ensure!(
            joints_name.iter().collect::<HashSet<_>>().len() == joint_num,
            "dataset '{}' has duplicated joint names",
            name
        );
        for &[lhs, rhs] in skeleton.iter().chain(flip_pairs.iter()) {
            ensure!(
                lhs < joint_num && rhs < joint_num,
                "joint pair ({}, {}) is out of range in dataset '{}'",
                lhs,
                rhs,
                name
            );
        }

        Ok(Self {
            name,
            joints_name,
            skeleton,
            flip_pairs,
            joints_have_depth,
        })
    }

    fn from_static(
        name: &str,
        joints_name: &[&str],
        skeleton: &[[usize; 2]],
        flip_pairs: &[[usize; 2]],
        joints_have_depth: bool,
    ) -> Self {
        Self {
            name: name.to_owned(),
            joints_name: joints_name.iter().map(|&name| name.to_owned()).collect(),
            skeleton: skeleton.to_vec(),
            flip_pairs: flip_pairs.to_vec(),
            joints_have_depth,
        }
    }

    /// The Human3.6M joints.
    pub fn human36m() -> Self {
        Self::from_static(
            "human36m",
            &[
                "Pelvis",
                "R_Hip",
                "R_Knee",
                "R_Ankle",
                "L_Hip",
                "L_Knee",
                "L_Ankle",
                "Torso",
                "Neck",
                "Nose",
                "Head",
                "L_Shoulder",
                "L_Elbow",
                "L_Wrist",
                "R_Shoulder",
                "R_Elbow",
                "R_Wrist",
                "Thorax",
            ],
            &[
                [0, 7],
                [7, 8],
                [8, 9],
                [9, 10],
                [8, 11],
                [11, 12],
                [12, 13],
                [8, 14],
                [14, 15],
                [15, 16],
                [0, 1],
                [1, 2],
                [2, 3],
                [0, 4],
                [4, 5],
                [5, 6],
            ],
            &[[1, 4], [2, 5], [3, 6], [14, 11], [15, 12], [16, 13]],
            true,
        )
    }

    /// The MPII joints.
    pub fn mpii() -> Self {
        Self::from_static(
            "mpii",
            &[
                "R_Ankle",
                "R_Knee",
                "R_Hip",
                "L_Hip",
                "L_Knee",
                "L_Ankle",
                "Pelvis",
                "Thorax",
                "Neck",
                "Head",
                "R_Wrist",
                "R_Elbow",
                "R_Shoulder",
                "L_Shoulder",
                "L_Elbow",
                "L_Wrist",
            ],
            &[
                [0, 1],
                [1, 2],
                [2, 6],
                [7, 12],
                [12, 11],
                [11, 10],
                [5, 4],
                [4, 3],
                [3, 6],
                [7, 13],
                [13, 14],
                [14, 15],
                [6, 7],
                [7, 8],
                [8, 9],
            ],
            &[[0, 5], [1, 4], [2, 3], [10, 15], [11, 14], [12, 13]],
            false,
        )
    }

    /// The MS COCO joints.
    pub fn mscoco() -> Self {
        Self::from_static(
            "mscoco",
            &[
                "Nose",
                "L_Eye",
                "R_Eye",
                "L_Ear",
                "R_Ear",
                "L_Shoulder",
                "R_Shoulder",
                "L_Elbow",
                "R_Elbow",
                "L_Wrist",
                "R_Wrist",
                "L_Hip",
                "R_Hip",
                "L_Knee",
                "R_Knee",
                "L_Ankle",
                "R_Ankle",
            ],
            &[
                [1, 2],
                [0, 1],
                [0, 2],
                [2, 4],
                [1, 3],
                [6, 8],
                [8, 10],
                [5, 7],
                [7, 9],
                [12, 14],
                [14, 16],
                [11, 13],
                [13, 15],
                [5, 6],
                [11, 12],
            ],
            &[
                [1, 2],
                [3, 4],
                [5, 6],
                [7, 8],
                [9, 10],
                [11, 12],
                [13, 14],
                [15, 16],
            ],
            false,
        )
    }

    pub fn joints_name(&self) -> &[String] {
        &self.joints_name
    }

    pub fn joint_num(&self) -> usize {
        self.joints_name.len()
    }
}

/// The dataset split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
