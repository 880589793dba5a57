//! WGSL sources. Work group sizes are spliced in before compilation so one
//! module serves any configured size.

const ACCUMULATE_GROUP: &str = "{{ACCUMULATE_GROUP}}";
const INTEGRATE_GROUP: &str = "{{INTEGRATE_GROUP}}";

/// Swarm kernels: `accumulate`, `integrate` and the legacy `fused`.
///
/// Bindings are shared by all three entry points: params uniform, read
/// generation, write generation, force buffer.
const SWARM_KERNELS: &str = r#"
struct Agent {
    position: vec2<f32>,
    reserved: f32,
    heading: f32,
};

struct Params {
    speed: f32,
    radius: f32,
    global_rotation: f32,
    local_rotation: f32,
};

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var<storage, read> agents_in: array<Agent>;
@group(0) @binding(2) var<storage, read_write> agents_out: array<Agent>;
@group(0) @binding(3) var<storage, read_write> forces: array<vec2<f32>>;

const TAU: f32 = 6.2831855;

fn fold(d: f32) -> f32 {
    if (d > 1.0) {
        return d - 2.0;
    }
    if (d < -1.0) {
        return d + 2.0;
    }
    return d;
}

fn wrap_coordinate(x: f32) -> f32 {
    if (x >= -1.0 && x <= 1.0) {
        return x;
    }
    let w = x - 2.0 * floor((x + 1.0) / 2.0);
    return select(w, -1.0, w >= 1.0);
}

fn wrap_heading(theta: f32) -> f32 {
    let w = theta - TAU * floor(theta / TAU);
    return select(w, 0.0, w >= TAU);
}

// (left, right) neighbour counts for agent i
fn scan(i: u32) -> vec2<f32> {
    let me = agents_in[i];
    let dir = vec2<f32>(cos(me.heading), sin(me.heading));
    let r2 = params.radius * params.radius;
    let n = arrayLength(&agents_in);
    var left = 0.0;
    var right = 0.0;
    for (var j = 0u; j < n; j = j + 1u) {
        if (j == i) {
            continue;
        }
        let p = agents_in[j].position;
        let d = vec2<f32>(fold(p.x - me.position.x), fold(p.y - me.position.y));
        if (dot(d, d) >= r2) {
            continue;
        }
        if (dir.x * d.y - dir.y * d.x > 0.0) {
            left = left + 1.0;
        } else {
            right = right + 1.0;
        }
    }
    return vec2<f32>(left, right);
}

fn advance(i: u32, force: vec2<f32>) -> Agent {
    let me = agents_in[i];
    let steer = params.local_rotation * (force.x + force.y) * sign(force.y - force.x);
    let heading = wrap_heading(me.heading + params.global_rotation + steer);
    let moved = me.position + params.speed * vec2<f32>(cos(heading), sin(heading));
    let position = vec2<f32>(wrap_coordinate(moved.x), wrap_coordinate(moved.y));
    return Agent(position, me.reserved, heading);
}

@compute @workgroup_size({{ACCUMULATE_GROUP}})
fn accumulate(@builtin(global_invocation_id) id: vec3<u32>) {
    let i = id.x;
    if (i >= arrayLength(&agents_in)) {
        return;
    }
    forces[i] = scan(i);
}

@compute @workgroup_size({{INTEGRATE_GROUP}})
fn integrate(@builtin(global_invocation_id) id: vec3<u32>) {
    let i = id.x;
    if (i >= arrayLength(&agents_in)) {
        return;
    }
    agents_out[i] = advance(i, forces[i]);
}

@compute @workgroup_size({{INTEGRATE_GROUP}})
fn fused(@builtin(global_invocation_id) id: vec3<u32>) {
    let i = id.x;
    if (i >= arrayLength(&agents_in)) {
        return;
    }
    agents_out[i] = advance(i, scan(i));
}
"#;

/// Instanced agent triangles, one instance per agent read straight from a
/// generation buffer.
pub const AGENT_SHADER: &str = r#"
struct View {
    scale: vec2<f32>,
    size: f32,
    _pad: f32,
};

@group(0) @binding(0)
var<uniform> frame_view: View;

struct AgentInput {
    @location(0) position_reserved: vec3<f32>,
    @location(1) heading: f32,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_agent(@builtin(vertex_index) vi: u32, agent: AgentInput) -> VertexOutput {
    var corners = array<vec2<f32>, 3>(
        vec2<f32>(1.0, 0.0),
        vec2<f32>(-0.6, 0.5),
        vec2<f32>(-0.6, -0.5),
    );
    let c = cos(agent.heading);
    let s = sin(agent.heading);
    let corner = corners[vi] * frame_view.size;
    let rotated = vec2<f32>(c * corner.x - s * corner.y, s * corner.x + c * corner.y);
    let pos = (agent.position_reserved.xy + rotated) * frame_view.scale;

    var out: VertexOutput;
    out.clip_position = vec4<f32>(pos, 0.0, 1.0);
    let hue = agent.heading / 6.2831855;
    out.color = vec4<f32>(
        0.5 + 0.5 * cos(6.2831855 * hue),
        0.5 + 0.5 * cos(6.2831855 * (hue - 0.333)),
        0.5 + 0.5 * cos(6.2831855 * (hue - 0.667)),
        agent.position_reserved.z,
    );
    return out;
}

@fragment
fn fs_agent(in: VertexOutput) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

/// Kernel source with the work group sizes filled in.
pub fn swarm_kernels(accumulate_group: u32, integrate_group: u32) -> String {
    SWARM_KERNELS
        .replace(ACCUMULATE_GROUP, &accumulate_group.to_string())
        .replace(INTEGRATE_GROUP, &integrate_group.to_string())
}
