pub mod time;

/// Alphabet used for generated element ids; lowercase keeps them diagram-friendly.
const ID_ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Length of the random suffix of generated element ids.
const ID_SUFFIX_LEN: usize = 7;

/// Globally unique id, used for transformation passes.
pub fn longid() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Fresh element id for a node of the given type tag.
///
/// The namespace is stripped from the type tag, so `bpmn:ServiceTask`
/// produces ids like `ServiceTask_0k3x9ab`.
pub fn element_id(type_tag: &str) -> String {
    let local = type_tag.rsplit(':').next().unwrap_or(type_tag);
    let local = if local.is_empty() { "Element" } else { local };
    format!("{}_{}", local, nanoid::nanoid!(ID_SUFFIX_LEN, &ID_ALPHABET))
}
