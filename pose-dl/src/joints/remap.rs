use crate::common::*;

/// Reorders per-joint values from the source joint order to the
/// destination joint order by name.
///
/// Destination joints missing in the source are filled with the default
/// value. Source joints missing in the destination are dropped.
pub fn transform_joint_to_other_db<T, S1, S2>(
    values: &[T],
    src_names: &[S1],
    dst_names: &[S2],
) -> Result<Vec<T>>
where
    T: Clone + Default,
    S1: AsRef<str>,
    S2: AsRef<str>,
{
    ensure!(
        values.len() == src_names.len(),
        "expect {} joints, but get {}",
        src_names.len(),
        values.len()
    );

    let src_indices: IndexMap<&str, usize> = src_names
        .iter()
        .enumerate()
        .map(|(index, name)| (name.as_ref(), index))
        .collect();
    ensure!(
        src_indices.len() == src_names.len(),
        "duplicated source joint names found"
    );

    let output = dst_names
        .iter()
        .map(|name| match src_indices.get(name.as_ref()) {
            Some(&index) => values[index].clone(),
            None => T::default(),
        })
        .collect();

    Ok(output)
}
