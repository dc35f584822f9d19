use anyhow::Result;
use approx::assert_abs_diff_eq;
use ndarray::Array2;
use ndarray_npy::NpzWriter;
use pose_dl::{
    dataset::{
        ConcatMode, FullOutput, FullPipelineInit, FullSample, InferenceDataset, InferenceSample,
        JointDb, JointMeta, JointRecord, JsonJointDb, LiftingInit, LiftingItem, LiftingOutput,
        MppeInit, MppeSample, MultipleDatasets, PatchSample, RawCaptureDataset, SampleDataset,
        Worker,
    },
    joints::KeypointSource,
    processor::PreprocessorInit,
};
use rand::{rngs::StdRng, SeedableRng};
use std::{fs::File, path::Path, sync::Arc};
use tch::{vision, Device, IndexOp, Kind, Tensor};
use tempfile::TempDir;

const IMAGE_WIDTH: i64 = 200;
const IMAGE_HEIGHT: i64 = 100;

fn meta() -> JointMeta {
    JointMeta::new(
        "synthetic",
        ["Pelvis", "L_Hip", "R_Hip", "Head"]
            .iter()
            .map(|name| name.to_string())
            .collect(),
        vec![[0, 1], [0, 2], [0, 3]],
        vec![[1, 2]],
        true,
    )
    .unwrap()
}

/// Writes a black image with a white square and one record whose box spans
/// the middle half of the image.
fn setup(with_size: bool) -> Result<(TempDir, Arc<dyn JointDb>)> {
    let dir = tempfile::tempdir()?;
    let image_path = dir.path().join("image.png");

    let image = Tensor::zeros(&[3, IMAGE_HEIGHT, IMAGE_WIDTH], (Kind::Uint8, Device::Cpu));
    let _ = image.i((.., 40..60, 90..110)).fill_(255i64);
    vision::image::save(&image, &image_path)?;

    let record: JointRecord = serde_json::from_value(serde_json::json!({
        "img_path": "image.png",
        "bbox": [50.0, 25.0, 100.0, 50.0],
        "joint_img": [
            [100.0, 50.0, 0.0],
            [60.0, 30.0, 0.0],
            [125.0, 50.0, 500.0],
            [10.0, 10.0, 0.0]
        ],
        "joint_cam": [
            [0.0, 0.0, 4000.0],
            [-100.0, 0.0, 4000.0],
            [100.0, 0.0, 4500.0],
            [0.0, -500.0, 4000.0]
        ],
        "joint_vis": [1.0, 1.0, 1.0, 1.0],
        "root_cam": [0.0, 0.0, 4000.0],
        "f": [1000.0, 1000.0],
        "c": [100.0, 50.0]
    }))?;
    let record = JointRecord {
        img_width: with_size.then(|| IMAGE_WIDTH as usize),
        img_height: with_size.then(|| IMAGE_HEIGHT as usize),
        ..record
    };

    let db: Arc<dyn JointDb> = Arc::new(JsonJointDb::from_records(
        vec![record],
        dir.path(),
        meta(),
    )?);
    Ok((dir, db))
}

fn value(tensor: &Tensor, index: &[i64]) -> f64 {
    tensor.double_value(index)
}

#[test]
fn full_pipeline_identity_crop() -> Result<()> {
    let (_dir, db) = setup(false)?;
    let preprocessor = Arc::new(PreprocessorInit::default().build()?);
    let dataset = FullPipelineInit {
        is_train: true,
        ..Default::default()
    }
    .build(db, preprocessor)?;
    assert_eq!(dataset.num_samples(), 1);

    let mut worker = Worker::new(0, 0);
    let sample = match dataset.sample(0, &mut worker)? {
        FullSample::Training(sample) => sample,
        other => panic!("unexpected sample {:?}", other),
    };

    assert_eq!(sample.image.size(), vec![3, 256, 256]);
    assert_eq!(sample.joint_img.size(), vec![4, 2]);
    assert_eq!(sample.joint_vis.size(), vec![4, 1]);

    // the box center lands on the center of the 64x64 grid
    assert_abs_diff_eq!(value(&sample.joint_img, &[0, 0]), 32.0, epsilon = 1e-3);
    assert_abs_diff_eq!(value(&sample.joint_img, &[0, 1]), 32.0, epsilon = 1e-3);
    assert_abs_diff_eq!(value(&sample.joint_img, &[1, 0]), 6.4, epsilon = 1e-3);
    assert_abs_diff_eq!(value(&sample.joint_img, &[1, 1]), 6.4, epsilon = 1e-3);
    assert_abs_diff_eq!(value(&sample.joint_img, &[2, 0]), 48.0, epsilon = 1e-3);

    // the head lies outside of the box
    let vis: Vec<_> = (0..4).map(|index| value(&sample.joint_vis, &[index, 0])).collect();
    assert_eq!(vis, vec![1.0, 1.0, 1.0, 0.0]);

    assert_abs_diff_eq!(value(&sample.joint_cam, &[2, 2]), 4.5, epsilon = 1e-6);
    assert_abs_diff_eq!(value(&sample.joints_have_depth, &[0]), 1.0);

    assert_eq!(worker.stats.samples, 1);
    assert_eq!(worker.stats.skipped_occlusions, 0);
    Ok(())
}

#[test]
fn full_pipeline_auxiliary_outputs() -> Result<()> {
    let (_dir, db) = setup(false)?;
    let preprocessor = Arc::new(PreprocessorInit::default().build()?);
    let mut worker = Worker::new(0, 0);

    let only_2d = FullPipelineInit {
        output: FullOutput::Only2d,
        ..Default::default()
    }
    .build(db.clone(), preprocessor.clone())?;
    match only_2d.sample(0, &mut worker)? {
        FullSample::Only2d(sample) => {
            assert!(sample.image.allclose(&sample.raw_image, 1e-5, 1e-5, false));
            assert_eq!(sample.joint_img.size(), vec![4, 2]);
            assert_abs_diff_eq!(value(&sample.joint_img, &[0, 0]), 100.0);
            assert_abs_diff_eq!(value(&sample.bbox, &[2]), 100.0);
            assert_abs_diff_eq!(value(&sample.f, &[0]), 1000.0);
        }
        other => panic!("unexpected sample {:?}", other),
    }

    let cache = FullPipelineInit {
        output: FullOutput::DetectionCache,
        ..Default::default()
    }
    .build(db.clone(), preprocessor.clone())?;
    match cache.sample(0, &mut worker)? {
        FullSample::DetectionCache(sample) => {
            assert_eq!(sample.width, IMAGE_WIDTH as usize);
            assert_eq!(sample.height, IMAGE_HEIGHT as usize);
        }
        other => panic!("unexpected sample {:?}", other),
    }

    let vis = FullPipelineInit {
        output: FullOutput::Visualization,
        ..Default::default()
    }
    .build(db, preprocessor)?;
    match vis.sample(0, &mut worker)? {
        FullSample::Visualization(sample) => {
            assert!(sample.image_path.ends_with("image.png"));
            // the image center maps to the origin
            assert_abs_diff_eq!(value(&sample.joint_img, &[0, 0]), 0.0, epsilon = 1e-6);
            assert_abs_diff_eq!(value(&sample.joint_img, &[0, 1]), 0.0, epsilon = 1e-6);
        }
        other => panic!("unexpected sample {:?}", other),
    }

    Ok(())
}

#[test]
fn occlusion_with_identity_crop() -> Result<()> {
    let (_dir, db) = setup(false)?;
    let preprocessor = Arc::new(PreprocessorInit::default().build()?);
    let dataset = FullPipelineInit {
        is_train: true,
        occlusion: true,
        ..Default::default()
    }
    .build(db, preprocessor)?;

    let mut worker = Worker::new(1, 42);
    for _ in 0..4 {
        dataset.sample(0, &mut worker)?;
    }
    assert_eq!(worker.stats.samples, 4);
    Ok(())
}

/// Overwrites the image with a black one carrying a 5x5 marker centered at
/// the right hip.
fn write_marker_image(dir: &Path) -> Result<()> {
    let image = Tensor::zeros(&[3, IMAGE_HEIGHT, IMAGE_WIDTH], (Kind::Uint8, Device::Cpu));
    let _ = image.i((.., 48..53, 123..128)).fill_(255i64);
    vision::image::save(&image, dir.join("image.png"))?;
    Ok(())
}

fn patch_pixel(sample: &PatchSample, joint: i64) -> f64 {
    // the label grid is 1/4 of the patch
    let x = value(&sample.joint_img, &[joint, 0]) * 4.0;
    let y = value(&sample.joint_img, &[joint, 1]) * 4.0;
    value(&sample.image, &[0, y.round() as i64, x.round() as i64])
}

#[test]
fn full_pipeline_random_augmentation_keeps_labels_on_pixels() -> Result<()> {
    let (dir, db) = setup(false)?;
    write_marker_image(dir.path())?;
    let preprocessor = Arc::new(PreprocessorInit::default().build()?);
    let dataset = FullPipelineInit {
        is_train: true,
        identity_augmentation: false,
        ..Default::default()
    }
    .build(db, preprocessor.clone())?;
    let mut num_flipped = 0;
    let mut num_rotated = 0;

    for seed in 0..16 {
        // the parameters are the first draw of the worker
        let params = preprocessor
            .augmentation()
            .sample(&mut StdRng::seed_from_u64(seed));
        let sample = match dataset.sample(0, &mut Worker::new(0, seed))? {
            FullSample::Training(sample) => sample,
            other => panic!("unexpected sample {:?}", other),
        };

        // a flip moves the right hip into the left hip slot
        let (marked, unmarked) = if params.do_flip {
            num_flipped += 1;
            (1, 2)
        } else {
            (2, 1)
        };
        if params.rotation != 0.0 {
            num_rotated += 1;
        }

        // normalized background pixels are negative
        assert_eq!(value(&sample.joint_vis, &[marked, 0]), 1.0);
        assert!(patch_pixel(&sample, marked) > 0.0, "seed {}", seed);
        if value(&sample.joint_vis, &[unmarked, 0]) == 1.0 {
            assert!(patch_pixel(&sample, unmarked) < 0.0, "seed {}", seed);
        }
    }

    assert!(num_flipped > 0);
    assert!(num_rotated > 0);
    Ok(())
}

#[test]
fn missing_image_is_an_error() -> Result<()> {
    let (dir, db) = setup(false)?;
    std::fs::remove_file(dir.path().join("image.png"))?;

    let preprocessor = Arc::new(PreprocessorInit::default().build()?);
    let dataset = FullPipelineInit::default().build(db.clone(), preprocessor)?;
    let mut worker = Worker::new(0, 0);
    let err = dataset.sample(0, &mut worker).unwrap_err();
    assert!(format!("{:#}", err).contains("image.png"));

    assert!(RawCaptureDataset::new(db).sample(0, &mut worker).is_err());
    Ok(())
}

#[test]
fn lifting_from_ground_truth() -> Result<()> {
    let (_dir, db) = setup(true)?;
    let dataset = LiftingInit {
        is_train: true,
        keypoints: KeypointSource::parse("gt")?,
        keypoints_dir: "unused".into(),
        output: LiftingOutput::Training,
    }
    .build(db)?;

    let mut worker = Worker::new(0, 0);
    let sample = match dataset.sample(0, &mut worker)? {
        LiftingItem::Training(sample) => sample,
        other => panic!("unexpected sample {:?}", other),
    };

    assert_eq!(sample.joint_img.size(), vec![4, 2]);
    assert_abs_diff_eq!(value(&sample.joint_img, &[0, 0]), 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(value(&sample.joint_img, &[1, 0]), -0.4, epsilon = 1e-6);
    assert_abs_diff_eq!(value(&sample.joint_img, &[1, 1]), -0.2, epsilon = 1e-6);
    assert_abs_diff_eq!(value(&sample.joint_img_raw, &[1, 1]), 30.0);
    assert_abs_diff_eq!(value(&sample.joint_cam, &[3, 1]), -0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(value(&sample.root_cam, &[2]), 4000.0);
    assert_eq!(sample.joint_vis.size(), vec![4, 1]);
    Ok(())
}

#[test]
fn lifting_from_detector_keypoints() -> Result<()> {
    let (dir, db) = setup(true)?;

    let x = Array2::from_shape_fn((1, 17), |(_, joint)| joint as f64 * 10.0);
    let y = Array2::from_shape_fn((1, 17), |(_, joint)| joint as f64 * 5.0);
    let mut npz = NpzWriter::new(File::create(dir.path().join("pelee_train.npz"))?);
    npz.add_array("x", &x)?;
    npz.add_array("y", &y)?;
    npz.finish()?;

    let init = LiftingInit {
        is_train: true,
        keypoints: KeypointSource::parse("pelee")?,
        keypoints_dir: dir.path().to_owned(),
        output: LiftingOutput::Training,
    };
    let dataset = init.clone().build(db.clone())?;

    let mut worker = Worker::new(0, 0);
    let sample = match dataset.sample(0, &mut worker)? {
        LiftingItem::Training(sample) => sample,
        other => panic!("unexpected sample {:?}", other),
    };

    // pelvis and head are synthesized from hips and ears
    let raw = &sample.joint_img_raw;
    assert_abs_diff_eq!(value(raw, &[0, 0]), 115.0, epsilon = 1e-4);
    assert_abs_diff_eq!(value(raw, &[0, 1]), 57.5, epsilon = 1e-4);
    assert_abs_diff_eq!(value(raw, &[1, 0]), 110.0, epsilon = 1e-4);
    assert_abs_diff_eq!(value(raw, &[2, 0]), 120.0, epsilon = 1e-4);
    assert_abs_diff_eq!(value(raw, &[3, 0]), 35.0, epsilon = 1e-4);
    assert_abs_diff_eq!(value(raw, &[3, 1]), 17.5, epsilon = 1e-4);

    // the validation archive is absent
    let valid = LiftingInit {
        is_train: false,
        ..init
    };
    assert!(valid.build(db).is_err());
    Ok(())
}

#[test]
fn unknown_detector_is_rejected() {
    assert!(KeypointSource::parse("openpose").is_err());
}

#[test]
fn inference_and_raw_capture() -> Result<()> {
    let (_dir, db) = setup(true)?;
    let mut worker = Worker::new(0, 0);

    let sample = InferenceDataset::new(db.clone()).sample(0, &mut worker)?;
    assert_eq!(sample.image.size(), vec![1]);
    assert_abs_diff_eq!(value(&sample.image, &[0]), -1.0);
    assert_abs_diff_eq!(value(&sample.joint_img, &[1, 0]), -0.4, epsilon = 1e-6);

    let sample = RawCaptureDataset::new(db).sample(0, &mut worker)?;
    assert_eq!(sample.image.kind(), Kind::Uint8);
    assert_eq!(sample.image.size(), vec![3, IMAGE_HEIGHT, IMAGE_WIDTH]);
    assert_eq!(sample.image.int64_value(&[0, 50, 100]), 255);
    assert_eq!((sample.width, sample.height), (200, 100));
    assert_abs_diff_eq!(value(&sample.joint_img, &[2, 0]), 125.0);
    Ok(())
}

#[test]
fn mppe_outputs() -> Result<()> {
    let (_dir, db) = setup(false)?;
    let preprocessor = Arc::new(PreprocessorInit::default().build()?);
    let mut worker = Worker::new(3, 7);

    let train = MppeInit {
        is_train: true,
        vis: false,
        ref_joints_name: Some(vec!["Head".into(), "Pelvis".into(), "Neck".into()]),
    }
    .build(db.clone(), preprocessor.clone())?;
    for _ in 0..4 {
        match train.sample(0, &mut worker)? {
            MppeSample::Training(sample) => {
                assert_eq!(sample.image.size(), vec![3, 256, 256]);
                assert_eq!(sample.joint_img.size(), vec![3, 3]);
                assert_eq!(sample.joint_vis.size(), vec![3, 1]);
                // neck is unknown to the dataset
                assert_abs_diff_eq!(value(&sample.joint_vis, &[2, 0]), 0.0);
            }
            other => panic!("unexpected sample {:?}", other),
        }
    }

    let eval = MppeInit {
        is_train: false,
        vis: false,
        ref_joints_name: None,
    }
    .build(db.clone(), preprocessor.clone())?;
    match eval.sample(0, &mut worker)? {
        MppeSample::Evaluation(sample) => {
            assert_abs_diff_eq!(value(&sample.joint_cam, &[2, 2]), 4500.0);
            assert_abs_diff_eq!(value(&sample.joint_img, &[2, 2]), 500.0);
            assert_abs_diff_eq!(value(&sample.root_cam, &[2]), 4000.0);
        }
        other => panic!("unexpected sample {:?}", other),
    }

    let vis = MppeInit {
        is_train: false,
        vis: true,
        ref_joints_name: None,
    }
    .build(db, preprocessor)?;
    assert!(matches!(
        vis.sample(0, &mut worker)?,
        MppeSample::Visualization(_)
    ));
    Ok(())
}

#[test]
fn concat_adapters() -> Result<()> {
    let (_dir, db) = setup(true)?;
    let datasets: Vec<Box<dyn SampleDataset<Sample = InferenceSample>>> = vec![
        Box::new(InferenceDataset::new(db.clone())),
        Box::new(InferenceDataset::new(db)),
    ];
    let multiple = MultipleDatasets::new(datasets, ConcatMode::SameLength)?;
    assert_eq!(multiple.num_samples(), 2);

    let mut worker = Worker::new(0, 0);
    for index in 0..2 {
        let sample = multiple.sample(index, &mut worker)?;
        assert_eq!(sample.joint_img.size(), vec![4, 2]);
    }
    assert!(multiple.sample(2, &mut worker).is_err());
    Ok(())
}

#[test]
fn json_records_resolve_relative_paths() -> Result<()> {
    let (dir, db) = setup(false)?;
    let record = db.record(0)?;
    assert_eq!(record.image_path, dir.path().join("image.png"));
    assert!(Path::new(&record.image_path).exists());
    Ok(())
}
