//! Persona instructions and the fixed display strings shown in the chat

/// Persona for general conversation on the fast model
pub const ASSISTANT_PERSONA: &str = r"You are the most advanced AI assistant. Your capabilities include:
- Answering **all types of questions** accurately.
- **Generating & executing Python code** with explanations.
- Providing **real-time factual information**.
- Engaging in **detailed conversations**.
- Thinking critically and giving **practical examples**.
Always **analyze** user queries before responding. Be **concise** if needed, but provide **detailed** responses when required.";

/// Persona for code generation on the high-capability model
pub const CODE_PERSONA: &str =
    "You are an expert Python developer. Generate optimized, error-free, well-commented Python code.";

/// Substrings that route a message to code generation (matched lowercase)
pub const CODE_TRIGGERS: &[&str] = &["generate code", "write python"];

pub const WELCOME: &str = "**🤖 Welcome to the Ultimate AI Chatbot!**\n\n\
💡 **Ask me anything!** I can:\n\
✅ Answer **complex questions**\n\
✅ Generate & **execute Python code**\n\
✅ Provide **real-time knowledge**\n\
✅ Engage in **detailed conversations**\n\n\
**Just type your query below!** 🚀";

pub const THINKING: &str = "🤖 *Thinking...*";

pub const NO_RESPONSE: &str = "❌ **Error:** AI couldn't generate a response. Please try again!";
pub const NO_CODE: &str = "❌ **Error:** AI couldn't generate code.";
pub const GRAPH_EMPTY: &str = "❌ **Error:** AI failed to respond. Please try again!";
pub const NO_EXEC_OUTPUT: &str = "✅ Code executed successfully, but no output was returned.";

pub fn current_time(timestamp: &str) -> String {
    format!("🕒 **Current Time:** {timestamp}")
}

pub fn reply(text: &str) -> String {
    format!("💬 {text}")
}

pub fn generated_code(code: &str) -> String {
    format!("📝 **Generated Python Code:**\n```python\n{code}\n```")
}

pub fn code_generation_error(error: &str) -> String {
    format!("❌ **Error in AI Code Generation:** {error}")
}

pub fn unexpected_error(error: &str) -> String {
    format!("❌ **Unexpected Error:** {error}")
}

pub fn critical_error(error: &str) -> String {
    format!("❌ **Critical Error:** {error}")
}

pub fn executed_output(output: &str) -> String {
    format!("🛠️ **Executed Code Output:**\n```\n{output}\n```")
}

pub fn execution_error(error: &str) -> String {
    format!("❌ **Execution Error:**\n```\n{error}\n```")
}
