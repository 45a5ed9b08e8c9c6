//! Material Graph Tests
//!
//! Tests for:
//! - Parameter index: uniqueness, empty names, sorted iteration
//! - Connections: socket validation, input replacement, cycle rejection
//! - Content hash: stable across slot reuse and insertion order, sensitive to
//!   configuration and topology
//! - Data layout: constant offsets, texture slots

use glam::Vec4;

use matgraph::compiler::{MaterialDataBinding, MaterialDataLayout, MaterialParameterType};
use matgraph::errors::MaterialError;
use matgraph::graph::MaterialGraph;
use matgraph::graph::blocks::{BinaryMathBlock, ConstColorBlock, ConstFloatBlock, ParameterBlock, UnlitOutputBlock};

// ============================================================================
// Parameters
// ============================================================================

#[test]
fn duplicate_parameter_names_are_rejected() {
    let mut graph = MaterialGraph::new();
    graph.add_block(ParameterBlock::float("Roughness", 0.5)).unwrap();

    let err = graph.add_block(ParameterBlock::float("Roughness", 0.1)).unwrap_err();
    assert!(matches!(err, MaterialError::DuplicateParameter(name) if name == "Roughness"));
    assert_eq!(graph.len(), 1);
}

#[test]
fn empty_parameter_name_is_rejected() {
    let mut graph = MaterialGraph::new();
    let err = graph.add_block(ParameterBlock::float("", 0.5)).unwrap_err();
    assert!(matches!(err, MaterialError::EmptyParameterName));
    assert!(graph.is_empty());
}

#[test]
fn parameters_iterate_sorted_by_name() {
    let mut graph = MaterialGraph::new();
    graph.add_block(ParameterBlock::float("Zeta", 0.0)).unwrap();
    graph.add_block(ParameterBlock::texture("Albedo")).unwrap();
    graph.add_block(ParameterBlock::color("Tint", Vec4::ONE)).unwrap();

    let names: Vec<&str> = graph.parameters().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["Albedo", "Tint", "Zeta"]);
}

#[test]
fn removing_a_parameter_frees_its_name() {
    let mut graph = MaterialGraph::new();
    let id = graph.add_block(ParameterBlock::float("Scale", 1.0)).unwrap();
    graph.remove_block(id).unwrap();
    assert!(graph.find_parameter("Scale").is_none());
    assert!(graph.add_block(ParameterBlock::float("Scale", 2.0)).is_ok());
}

// ============================================================================
// Connections
// ============================================================================

#[test]
fn connect_validates_socket_names() {
    let mut graph = MaterialGraph::new();
    let value = graph.add_block(ConstFloatBlock::new(1.0)).unwrap();
    let output = graph.add_block(UnlitOutputBlock::default()).unwrap();

    let err = graph.connect(value, "Nope", output, "Color").unwrap_err();
    assert!(matches!(err, MaterialError::UnknownSocket { direction: "output", .. }));

    let err = graph.connect(value, "Out", output, "Albedo").unwrap_err();
    assert!(matches!(err, MaterialError::UnknownSocket { direction: "input", .. }));
}

#[test]
fn connecting_an_input_twice_replaces_the_edge() {
    let mut graph = MaterialGraph::new();
    let a = graph.add_block(ConstFloatBlock::new(1.0)).unwrap();
    let b = graph.add_block(ConstFloatBlock::new(2.0)).unwrap();
    let output = graph.add_block(UnlitOutputBlock::default()).unwrap();

    graph.connect(a, "Out", output, "Opacity").unwrap();
    graph.connect(b, "Out", output, "Opacity").unwrap();

    assert_eq!(graph.connections().len(), 1);
    assert_eq!(graph.input_connection(output, "Opacity").unwrap().source, b);
}

#[test]
fn cycles_are_rejected() {
    let mut graph = MaterialGraph::new();
    let first = graph.add_block(BinaryMathBlock::add()).unwrap();
    let second = graph.add_block(BinaryMathBlock::add()).unwrap();

    graph.connect(first, "Out", second, "A").unwrap();
    let err = graph.connect(second, "Out", first, "A").unwrap_err();
    assert!(matches!(err, MaterialError::CyclicConnection(_)));

    let err = graph.connect(first, "Out", first, "B").unwrap_err();
    assert!(matches!(err, MaterialError::CyclicConnection(_)));
}

#[test]
fn removing_a_block_drops_its_connections() {
    let mut graph = MaterialGraph::new();
    let a = graph.add_block(ConstFloatBlock::new(1.0)).unwrap();
    let output = graph.add_block(UnlitOutputBlock::default()).unwrap();
    graph.connect(a, "Out", output, "Opacity").unwrap();

    graph.remove_block(a);
    assert!(!graph.has_connection(output, "Opacity"));
}

#[test]
fn output_block_is_found() {
    let mut graph = MaterialGraph::new();
    graph.add_block(ConstFloatBlock::new(1.0)).unwrap();
    assert!(graph.find_output_block().is_none());

    let output = graph.add_block(UnlitOutputBlock::default()).unwrap();
    assert_eq!(graph.find_output_block().map(|(id, _)| id), Some(output));
}

// ============================================================================
// Content hash
// ============================================================================

fn color_graph(color: Vec4) -> MaterialGraph {
    let mut graph = MaterialGraph::new();
    let c = graph.add_block(ConstColorBlock::new(color)).unwrap();
    let output = graph.add_block(UnlitOutputBlock::default()).unwrap();
    graph.connect(c, "RGB", output, "Color").unwrap();
    graph
}

#[test]
fn content_hash_is_stable_for_equal_graphs() {
    assert_eq!(color_graph(Vec4::ONE).content_hash(), color_graph(Vec4::ONE).content_hash());
}

#[test]
fn content_hash_ignores_arena_slot_reuse() {
    let mut graph = MaterialGraph::new();
    let scratch = graph.add_block(ConstFloatBlock::new(9.0)).unwrap();
    graph.remove_block(scratch);
    let c = graph.add_block(ConstColorBlock::new(Vec4::ONE)).unwrap();
    let output = graph.add_block(UnlitOutputBlock::default()).unwrap();
    graph.connect(c, "RGB", output, "Color").unwrap();

    assert_eq!(graph.content_hash(), color_graph(Vec4::ONE).content_hash());
}

fn sum_graph(blocks_first: bool) -> MaterialGraph {
    let mut graph = MaterialGraph::new();
    let (two, three, add, output) = if blocks_first {
        let two = graph.add_block(ConstFloatBlock::new(2.0)).unwrap();
        let three = graph.add_block(ConstFloatBlock::new(3.0)).unwrap();
        let add = graph.add_block(BinaryMathBlock::add()).unwrap();
        let output = graph.add_block(UnlitOutputBlock::default()).unwrap();
        (two, three, add, output)
    } else {
        let output = graph.add_block(UnlitOutputBlock::default()).unwrap();
        let add = graph.add_block(BinaryMathBlock::add()).unwrap();
        let three = graph.add_block(ConstFloatBlock::new(3.0)).unwrap();
        let two = graph.add_block(ConstFloatBlock::new(2.0)).unwrap();
        (two, three, add, output)
    };
    graph.connect(add, "Out", output, "Opacity").unwrap();
    graph.connect(three, "Out", add, "B").unwrap();
    graph.connect(two, "Out", add, "A").unwrap();
    graph
}

#[test]
fn content_hash_ignores_insertion_order() {
    assert_eq!(sum_graph(true).content_hash(), sum_graph(false).content_hash());
}

#[test]
fn content_hash_distinguishes_shared_and_duplicated_sources() {
    let mut shared = MaterialGraph::new();
    let two = shared.add_block(ConstFloatBlock::new(2.0)).unwrap();
    shared.add_block(ConstFloatBlock::new(2.0)).unwrap();
    let add = shared.add_block(BinaryMathBlock::add()).unwrap();
    shared.connect(two, "Out", add, "A").unwrap();
    shared.connect(two, "Out", add, "B").unwrap();

    let mut duplicated = MaterialGraph::new();
    let a = duplicated.add_block(ConstFloatBlock::new(2.0)).unwrap();
    let b = duplicated.add_block(ConstFloatBlock::new(2.0)).unwrap();
    let add = duplicated.add_block(BinaryMathBlock::add()).unwrap();
    duplicated.connect(a, "Out", add, "A").unwrap();
    duplicated.connect(b, "Out", add, "B").unwrap();

    assert_ne!(shared.content_hash(), duplicated.content_hash());
}

#[test]
fn content_hash_tracks_the_selected_output() {
    let build = |opaque_first: bool| {
        let mut graph = MaterialGraph::new();
        let opacities = if opaque_first { [1.0, 0.5] } else { [0.5, 1.0] };
        for opacity in opacities {
            let value = graph.add_block(ConstFloatBlock::new(opacity)).unwrap();
            let output = graph.add_block(UnlitOutputBlock::default()).unwrap();
            graph.connect(value, "Out", output, "Opacity").unwrap();
        }
        graph
    };
    assert_ne!(build(true).content_hash(), build(false).content_hash());
}

#[test]
fn content_hash_tracks_configuration_and_topology() {
    let base = color_graph(Vec4::ONE).content_hash();
    assert_ne!(base, color_graph(Vec4::new(1.0, 0.0, 0.0, 1.0)).content_hash());

    let mut rewired = MaterialGraph::new();
    let c = rewired.add_block(ConstColorBlock::new(Vec4::ONE)).unwrap();
    let output = rewired.add_block(UnlitOutputBlock::default()).unwrap();
    rewired.connect(c, "R", output, "Color").unwrap();
    assert_ne!(base, rewired.content_hash());
}

// ============================================================================
// Data layout
// ============================================================================

#[test]
fn layout_packs_constants_and_numbers_textures() {
    let mut graph = MaterialGraph::new();
    graph.add_block(ParameterBlock::float("A", 0.0)).unwrap();
    graph.add_block(ParameterBlock::color("B", Vec4::ONE)).unwrap();
    graph.add_block(ParameterBlock::texture("C")).unwrap();
    graph.add_block(ParameterBlock::texture("D")).unwrap();

    let layout = MaterialDataLayout::build(&graph);

    let a = layout.find_param_entry("A").unwrap();
    assert_eq!(a.binding, MaterialDataBinding::Constant { offset: 0 });
    let b = layout.find_param_entry("B").unwrap();
    assert_eq!(b.binding, MaterialDataBinding::Constant { offset: 16 });
    assert_eq!(b.ty, MaterialParameterType::Color);

    assert_eq!(layout.find_param_entry("C").unwrap().binding, MaterialDataBinding::Texture { slot: 0 });
    assert_eq!(layout.find_param_entry("D").unwrap().binding, MaterialDataBinding::Texture { slot: 1 });
    assert_eq!(layout.constant_buffer_size(), 32);
    assert!(layout.find_param_entry("E").is_none());
}
