use crate::{AnimationSample, BoneData, BoneSample, Error};
use glam::{Mat4, Vec3};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Visit {
    Pending,
    Walking,
    Done,
}

/// Bind-pose bone hierarchy.
///
/// Parents are not required to precede their children in index order. The
/// parent-before-child evaluation order is computed once here, and construction
/// fails if the parent links do not form a forest.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Skeleton {
    bones: Vec<BoneData>,
    children: Vec<Vec<usize>>,
    update_order: Vec<usize>,
}

impl Skeleton {
    pub fn new(bones: Vec<BoneData>) -> Result<Self, Error> {
        let count = bones.len();
        let mut children = vec![Vec::new(); count];
        for (i, bone) in bones.iter().enumerate() {
            if let Some(parent) = bone.parent {
                if parent >= count {
                    return Err(Error::InvalidParent {
                        bone: i,
                        parent: parent as i64,
                        count,
                    });
                }
                children[parent].push(i);
            }
        }

        let update_order = update_order(&bones)?;
        Ok(Self {
            bones,
            children,
            update_order,
        })
    }

    /// Attaches names by bone index. Extra names are ignored, missing ones leave the
    /// bone unnamed.
    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for (bone, name) in self.bones.iter_mut().zip(names) {
            bone.name = Some(name.into());
        }
        self
    }

    pub fn bones(&self) -> &[BoneData] {
        &self.bones
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn bone(&self, index: usize) -> Option<&BoneData> {
        self.bones.get(index)
    }

    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.bones
            .iter()
            .position(|b| b.name.as_deref() == Some(name))
    }

    pub fn children(&self, index: usize) -> &[usize] {
        self.children.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn child_count(&self, index: usize) -> usize {
        self.children(index).len()
    }

    /// `[parent, child]` pairs in bone declaration order.
    pub fn edges(&self) -> Vec<[usize; 2]> {
        self.bones
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.parent.map(|p| [p, i]))
            .collect()
    }

    /// Bone indices with every parent listed before its children.
    pub fn update_order(&self) -> &[usize] {
        &self.update_order
    }

    /// One point per bone at its bind translation.
    pub fn bind_points(&self) -> Vec<Vec3> {
        self.bones.iter().map(|b| b.bind_position).collect()
    }

    /// The per-bone local transforms that reproduce the bind pose exactly.
    ///
    /// Root bones get the identity; a child gets `inverse(M_parent) * M_child`
    /// decomposed into translation and rotation.
    pub fn rest_sample(&self) -> AnimationSample {
        let bones = self
            .bones
            .iter()
            .map(|bone| {
                let Some(parent) = bone.parent else {
                    return BoneSample::default();
                };
                let local = self.bones[parent].bind_matrix().inverse() * bone.bind_matrix();
                let (_, rotation, translation) = local.to_scale_rotation_translation();
                BoneSample {
                    translation,
                    rotation,
                    ..BoneSample::default()
                }
            })
            .collect();
        AnimationSample {
            frame: 0,
            max_frame: 0,
            bones,
        }
    }

    pub(crate) fn bind_matrices(&self) -> Vec<Mat4> {
        self.bones.iter().map(BoneData::bind_matrix).collect()
    }
}

fn update_order(bones: &[BoneData]) -> Result<Vec<usize>, Error> {
    let mut state = vec![Visit::Pending; bones.len()];
    let mut order = Vec::with_capacity(bones.len());
    let mut chain = Vec::new();

    for start in 0..bones.len() {
        if state[start] == Visit::Done {
            continue;
        }

        // Walk up until a root or an already placed ancestor, then place the chain
        // top-down.
        chain.clear();
        let mut cursor = Some(start);
        while let Some(i) = cursor {
            match state[i] {
                Visit::Done => break,
                Visit::Walking => return Err(Error::CyclicHierarchy { bone: i }),
                Visit::Pending => {
                    state[i] = Visit::Walking;
                    chain.push(i);
                    cursor = bones[i].parent;
                }
            }
        }
        for &i in chain.iter().rev() {
            state[i] = Visit::Done;
            order.push(i);
        }
    }

    Ok(order)
}
