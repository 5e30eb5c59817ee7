// Export templates. Rendered by `sessions::export` with minijinja; the HTML
// template is registered under an `.html` name so values are auto-escaped.

pub const SESSION_TEXT_TEMPLATE: &str = r#"MOCK INTERVIEW SUMMARY
======================
Scenario:    {{ scenario_name }}
Session:     {{ session_id }}
Industry:    {{ industry }}
Difficulty:  {{ difficulty }}
Status:      {{ status }}
Started:     {{ started_at }}
{% if finished_at %}Finished:    {{ finished_at }}
{% endif %}Estimated:   {{ estimated_duration_minutes }} min

PERFORMANCE
-----------
Completion:        {{ completion }} ({{ answered }}/{{ total_questions }} questions)
Total words:       {{ total_words }}
Average words:     {{ average_words }}
Average response:  {{ average_duration }}
{% for line in categories %}  {{ line.name }}: {{ line.count }}
{% endfor %}
TRANSCRIPT
----------
{% for r in responses %}
Q{{ r.number }} [{{ r.category }}] {{ r.question_text }}
  Words: {{ r.word_count }} | Time: {{ r.duration }}

{{ r.response_text }}
{% else %}
No responses recorded.
{% endfor %}
"#;

pub const SESSION_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{ scenario_name }} - Mock Interview Summary</title>
</head>
<body>
<h1>{{ scenario_name }}</h1>
<table class="meta">
<tr><th>Session</th><td>{{ session_id }}</td></tr>
<tr><th>Industry</th><td>{{ industry }}</td></tr>
<tr><th>Difficulty</th><td>{{ difficulty }}</td></tr>
<tr><th>Status</th><td>{{ status }}</td></tr>
<tr><th>Started</th><td>{{ started_at }}</td></tr>
{% if finished_at %}<tr><th>Finished</th><td>{{ finished_at }}</td></tr>
{% endif %}<tr><th>Estimated</th><td>{{ estimated_duration_minutes }} min</td></tr>
</table>
<h2>Performance</h2>
<ul class="metrics">
<li>Completion: {{ completion }} ({{ answered }}/{{ total_questions }} questions)</li>
<li>Total words: {{ total_words }}</li>
<li>Average words: {{ average_words }}</li>
<li>Average response: {{ average_duration }}</li>
{% for line in categories %}<li>{{ line.name }}: {{ line.count }}</li>
{% endfor %}</ul>
<h2>Transcript</h2>
{% for r in responses %}<section class="response">
<h3>Q{{ r.number }} <small>{{ r.category }}</small></h3>
<p class="question">{{ r.question_text }}</p>
<p class="stats">Words: {{ r.word_count }} | Time: {{ r.duration }}</p>
<blockquote>{{ r.response_text }}</blockquote>
</section>
{% else %}<p>No responses recorded.</p>
{% endfor %}</body>
</html>
"#;
